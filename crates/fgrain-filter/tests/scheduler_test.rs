//! Frame server protocol tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fgrain_core::format::GRAY_S;
use fgrain_core::{Frame, FrameBuilder};
use rayon::prelude::*;
use fgrain_filter::{
    Activation, ClipSource, Filter, FilterDependency, FilterError, FilterMode, FilterResult,
    FrameContext, FrameServer, Node, RequestPattern, VideoInfo,
};

/// Averages frames n-1, n and n+1 (clamped) of its upstream.
struct Temporal {
    upstream: Node,
    info: VideoInfo,
    mode: FilterMode,
    initial_calls: AtomicUsize,
    ready_calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Temporal {
    fn new(upstream: Node, mode: FilterMode) -> Self {
        let info = upstream.video_info().clone();
        Self {
            upstream,
            info,
            mode,
            initial_calls: AtomicUsize::new(0),
            ready_calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    fn window(&self, n: usize) -> Vec<usize> {
        let last = self.info.num_frames - 1;
        let mut w = vec![n.saturating_sub(1), n, (n + 1).min(last)];
        w.dedup();
        w
    }
}

impl Filter for Temporal {
    fn name(&self) -> &str {
        "Temporal"
    }

    fn video_info(&self) -> &VideoInfo {
        &self.info
    }

    fn filter_mode(&self) -> FilterMode {
        self.mode
    }

    fn dependencies(&self) -> Vec<FilterDependency> {
        vec![FilterDependency {
            node: Arc::clone(&self.upstream),
            pattern: RequestPattern::General,
        }]
    }

    fn get_frame(&self, n: usize, activation: Activation, ctx: &mut FrameContext) -> FilterResult<Option<Frame>> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(2));

        let result = match activation {
            Activation::Initial => {
                self.initial_calls.fetch_add(1, Ordering::SeqCst);
                for m in self.window(n) {
                    ctx.request_frame(m, &self.upstream);
                }
                Ok(None)
            }
            Activation::AllFramesReady => {
                self.ready_calls.fetch_add(1, Ordering::SeqCst);
                let window = self.window(n);
                let mut sum = 0.0;
                let mut first = None;
                for m in &window {
                    let f = ctx.take_frame(*m, &self.upstream)?;
                    sum += f.plane_f32(0)?.get(0, 0);
                    first.get_or_insert(f);
                }
                match first {
                    Some(f) => {
                        let mut dst = FrameBuilder::new_like(&f);
                        let mut view = dst.plane_f32_mut(0)?;
                        for row in view.rows_mut() {
                            row.fill(sum / window.len() as f32);
                        }
                        Ok(Some(dst.freeze()))
                    }
                    None => Ok(None),
                }
            }
        };
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn ramp_clip(n: usize) -> Node {
    let frames = (0..n).map(|i| Frame::filled(GRAY_S, 4, 4, i as f32)).collect();
    Arc::new(ClipSource::new(frames))
}

fn value(f: &Frame) -> f32 {
    f.plane_f32(0).unwrap().get(1, 1)
}

#[test]
fn test_multi_frame_requests() {
    let temporal = Arc::new(Temporal::new(ramp_clip(5), FilterMode::Parallel));
    let node: Node = temporal.clone();
    let server = FrameServer::new();

    assert_eq!(value(&server.get_frame(&node, 0).unwrap()), 0.5);
    assert_eq!(value(&server.get_frame(&node, 2).unwrap()), 2.0);
    assert_eq!(value(&server.get_frame(&node, 4).unwrap()), 3.5);

    // exactly one activation of each kind per request
    assert_eq!(temporal.initial_calls.load(Ordering::SeqCst), 3);
    assert_eq!(temporal.ready_calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_batch_order() {
    let node: Node = Arc::new(Temporal::new(ramp_clip(12), FilterMode::Parallel));
    let server = FrameServer::with_threads(4).unwrap();
    let frames = server.get_frames(&node, 0..12).unwrap();
    let values: Vec<f32> = frames.iter().map(value).collect();
    let expected: Vec<f32> = (0..12)
        .map(|n: usize| {
            let w: Vec<usize> = {
                let mut w = vec![n.saturating_sub(1), n, (n + 1).min(11)];
                w.dedup();
                w
            };
            w.iter().sum::<usize>() as f32 / w.len() as f32
        })
        .collect();
    assert_eq!(values, expected);
}

#[test]
fn test_serial_filter_never_concurrent() {
    let temporal = Arc::new(Temporal::new(ramp_clip(16), FilterMode::Serial));
    let node: Node = temporal.clone();
    let server = FrameServer::with_threads(4).unwrap();
    server.get_frames(&node, 0..16).unwrap();
    assert_eq!(temporal.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(temporal.ready_calls.load(Ordering::SeqCst), 16);
}

#[test]
fn test_serial_in_parallel_batch_api() {
    let temporal = Arc::new(Temporal::new(ramp_clip(6), FilterMode::Serial));
    let node: Node = temporal.clone();
    assert!(!fgrain_filter::server::chain_is_parallel(&node));

    let upper: Node = Arc::new(Temporal::new(node, FilterMode::Parallel));
    assert!(!fgrain_filter::server::chain_is_parallel(&upper));
    assert!(fgrain_filter::server::chain_is_parallel(&ramp_clip(2)));
}

/// Serial pass-through that fans work out on rayon inside its call.
struct Fanout {
    upstream: Node,
    info: VideoInfo,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Filter for Fanout {
    fn name(&self) -> &str {
        "Fanout"
    }

    fn video_info(&self) -> &VideoInfo {
        &self.info
    }

    fn filter_mode(&self) -> FilterMode {
        FilterMode::Serial
    }

    fn dependencies(&self) -> Vec<FilterDependency> {
        vec![FilterDependency {
            node: Arc::clone(&self.upstream),
            pattern: RequestPattern::StrictSpatial,
        }]
    }

    fn get_frame(&self, n: usize, activation: Activation, ctx: &mut FrameContext) -> FilterResult<Option<Frame>> {
        match activation {
            Activation::Initial => {
                ctx.request_frame(n, &self.upstream);
                Ok(None)
            }
            Activation::AllFramesReady => {
                let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_active.fetch_max(now, Ordering::SeqCst);

                let src = ctx.take_frame(n, &self.upstream)?;
                let mut dst = FrameBuilder::new_like(&src);
                {
                    let src_view = src.plane_f32(0)?;
                    let mut view = dst.plane_f32_mut(0)?;
                    let rows: Vec<Vec<f32>> = (0..view.height())
                        .into_par_iter()
                        .map(|y| {
                            std::thread::sleep(std::time::Duration::from_millis(1));
                            src_view.row(y).to_vec()
                        })
                        .collect();
                    for (row, values) in view.rows_mut().zip(rows) {
                        row.copy_from_slice(&values);
                    }
                }

                self.active.fetch_sub(1, Ordering::SeqCst);
                Ok(Some(dst.freeze()))
            }
        }
    }
}

#[test]
fn test_serial_filter_using_rayon() {
    let upstream = ramp_clip(8);
    let info = upstream.video_info().clone();
    let fanout = Arc::new(Fanout {
        upstream,
        info,
        active: AtomicUsize::new(0),
        max_active: AtomicUsize::new(0),
    });
    let node: Node = Arc::new(Temporal::new(fanout.clone(), FilterMode::Parallel));

    let server = FrameServer::with_threads(2).unwrap();
    let values: Vec<f32> = server.get_frames(&node, 0..8).unwrap().iter().map(value).collect();
    assert_eq!(values, vec![0.5, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 6.5]);
    assert_eq!(fanout.max_active.load(Ordering::SeqCst), 1);
}

#[test]
fn test_chained_filters() {
    let inner: Node = Arc::new(Temporal::new(ramp_clip(5), FilterMode::Parallel));
    let outer: Node = Arc::new(Temporal::new(inner, FilterMode::Parallel));
    let server = FrameServer::new();
    // inner: [0.5, 1, 2, 3, 3.5]; outer at 2: (1 + 2 + 3) / 3
    assert_eq!(value(&server.get_frame(&outer, 2).unwrap()), 2.0);
    assert_eq!(value(&server.get_frame(&outer, 0).unwrap()), 0.75);
}

#[test]
fn test_upstream_error_propagates() {
    // Upstream claims more frames than it has
    let broken = ClipSource::new(vec![Frame::filled(GRAY_S, 4, 4, 0.0)]);
    struct Liar {
        inner: Node,
        info: VideoInfo,
    }
    impl Filter for Liar {
        fn name(&self) -> &str {
            "Liar"
        }
        fn video_info(&self) -> &VideoInfo {
            &self.info
        }
        fn get_frame(&self, n: usize, a: Activation, ctx: &mut FrameContext) -> FilterResult<Option<Frame>> {
            self.inner.get_frame(n, a, ctx)
        }
    }
    let liar: Node = Arc::new(Liar {
        inner: Arc::new(broken),
        info: VideoInfo::new(GRAY_S, 4, 4, 3),
    });
    let node: Node = Arc::new(Temporal::new(liar, FilterMode::Parallel));
    let server = FrameServer::new();
    assert!(matches!(
        server.get_frame(&node, 1),
        Err(FilterError::FrameOutOfRange { n: 1, num_frames: 1 })
    ));
}
