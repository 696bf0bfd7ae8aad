//! Filter node protocol.
//!
//! A clip is a graph of [`Filter`] nodes. Producing frame `n` of a node is a
//! two-phase exchange driven by the [`FrameServer`](crate::FrameServer):
//!
//! 1. [`Activation::Initial`]: the filter records the upstream frames it
//!    needs with [`FrameContext::request_frame`] and returns `None`. Source
//!    nodes may return their frame directly.
//! 2. [`Activation::AllFramesReady`]: every requested frame has been
//!    produced; the filter takes them with [`FrameContext::take_frame`] and
//!    returns its output.
//!
//! Between the phases the request is suspended; no thread is blocked on
//! the filter's behalf while upstream frames are computed.

use std::fmt;
use std::sync::Arc;

use fgrain_core::{Frame, VideoFormat};

use crate::{FilterError, FilterResult};

/// Clip-level description of a node's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    /// Format shared by all frames, or `None` when it varies per frame.
    pub format: Option<VideoFormat>,
    /// Luma width, 0 when it varies per frame.
    pub width: u32,
    /// Luma height, 0 when it varies per frame.
    pub height: u32,
    /// Number of frames.
    pub num_frames: usize,
    /// Frame rate numerator.
    pub fps_num: u64,
    /// Frame rate denominator.
    pub fps_den: u64,
}

impl VideoInfo {
    /// Constant-format clip description at 24 fps.
    pub fn new(format: VideoFormat, width: u32, height: u32, num_frames: usize) -> Self {
        Self {
            format: Some(format),
            width,
            height,
            num_frames,
            fps_num: 24,
            fps_den: 1,
        }
    }

    /// Clip whose frames differ in format or size.
    pub fn variable(num_frames: usize) -> Self {
        Self {
            format: None,
            width: 0,
            height: 0,
            num_frames,
            fps_num: 0,
            fps_den: 1,
        }
    }

    /// Returns a copy with the given frame rate.
    pub fn with_fps(mut self, num: u64, den: u64) -> Self {
        self.fps_num = num;
        self.fps_den = den.max(1);
        self
    }

    /// Whether every frame has the same, known format and dimensions.
    pub fn is_constant_format(&self) -> bool {
        self.format.is_some() && self.width > 0 && self.height > 0
    }

    /// Format name, `"variable"` if unknown.
    pub fn format_name(&self) -> String {
        match self.format {
            Some(f) if self.is_constant_format() => f.name(),
            _ => "variable".to_string(),
        }
    }
}

/// Reason a filter's `get_frame` is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// First call for a request: declare dependencies.
    Initial,
    /// Every requested upstream frame is available.
    AllFramesReady,
}

/// Concurrency contract of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Any number of requests may run concurrently.
    #[default]
    Parallel,
    /// At most one `get_frame` call at a time.
    ///
    /// The call may use rayon internally. Requests into a chain containing
    /// a serial node are resolved sequentially, so work stolen during such
    /// a call never re-enters the same node.
    Serial,
}

/// How a filter's output frames map onto upstream frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPattern {
    /// Arbitrary upstream frames.
    General,
    /// Output frame `n` depends only on upstream frame `n`.
    StrictSpatial,
}

/// Upstream dependency declaration.
#[derive(Clone)]
pub struct FilterDependency {
    /// Upstream node.
    pub node: Node,
    /// Request pattern towards that node.
    pub pattern: RequestPattern,
}

impl fmt::Debug for FilterDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterDependency")
            .field("node", &self.node.name())
            .field("pattern", &self.pattern)
            .finish()
    }
}

/// A node in the filter graph.
pub trait Filter: Send + Sync {
    /// Filter name, used in errors and logs.
    fn name(&self) -> &str;

    /// Output clip description.
    fn video_info(&self) -> &VideoInfo;

    /// Concurrency contract.
    fn filter_mode(&self) -> FilterMode {
        FilterMode::Parallel
    }

    /// Upstream nodes this filter pulls frames from.
    fn dependencies(&self) -> Vec<FilterDependency> {
        Vec::new()
    }

    /// Produces frame `n` or declares what is needed to produce it.
    ///
    /// Returning `Ok(None)` from [`Activation::AllFramesReady`] is an error
    /// reported by the server.
    fn get_frame(&self, n: usize, activation: Activation, ctx: &mut FrameContext) -> FilterResult<Option<Frame>>;
}

/// Shared handle to a filter.
pub type Node = Arc<dyn Filter>;

/// Identity of a node, independent of the vtable part of the pointer.
#[inline]
pub(crate) fn node_id(node: &Node) -> usize {
    Arc::as_ptr(node) as *const () as usize
}

/// Per-request state passed to [`Filter::get_frame`].
pub struct FrameContext {
    filter: String,
    requests: Vec<(usize, Node)>,
    ready: Vec<(usize, usize, Frame)>,
}

impl FrameContext {
    /// Empty context for a request served by `filter`.
    pub fn new(filter: &str) -> Self {
        Self {
            filter: filter.to_string(),
            requests: Vec::new(),
            ready: Vec::new(),
        }
    }

    /// Asks for frame `n` of `node`. Only meaningful during
    /// [`Activation::Initial`].
    pub fn request_frame(&mut self, n: usize, node: &Node) {
        let id = node_id(node);
        if !self.requests.iter().any(|(m, r)| *m == n && node_id(r) == id) {
            self.requests.push((n, Arc::clone(node)));
        }
    }

    /// Hands over a requested frame during [`Activation::AllFramesReady`].
    ///
    /// Each frame can be taken once.
    pub fn take_frame(&mut self, n: usize, node: &Node) -> FilterResult<Frame> {
        let id = node_id(node);
        let pos = self
            .ready
            .iter()
            .position(|(m, r, _)| *m == n && *r == id)
            .ok_or_else(|| FilterError::MissingFrame {
                filter: self.filter.clone(),
                n,
                node: node.name().to_string(),
            })?;
        Ok(self.ready.swap_remove(pos).2)
    }

    /// Outstanding requests, in request order.
    pub fn requests(&self) -> &[(usize, Node)] {
        &self.requests
    }

    pub(crate) fn take_requests(&mut self) -> Vec<(usize, Node)> {
        std::mem::take(&mut self.requests)
    }

    pub(crate) fn supply(&mut self, n: usize, node: &Node, frame: Frame) {
        self.ready.push((n, node_id(node), frame));
    }
}
