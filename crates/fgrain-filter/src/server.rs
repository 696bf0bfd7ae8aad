//! Frame server: drives the two-phase request protocol.
//!
//! A request for frame `n` of a node runs the node's
//! [`Activation::Initial`] phase, resolves every upstream frame it asked
//! for (recursively, in parallel on the rayon pool) and then re-enters the
//! node with [`Activation::AllFramesReady`]. The node never blocks waiting
//! for its inputs.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use fgrain_compute::Backend;
//! use fgrain_core::format::GRAY_S;
//! use fgrain_filter::{BlankClip, FilmGrain, FrameServer, GrainConfig, Node};
//!
//! let clip: Node = Arc::new(BlankClip::new(GRAY_S, 16, 16, 2, 0.5));
//! let config = GrainConfig { num_iterations: Some(16), ..Default::default() };
//! let grain = FilmGrain::with_config(clip, &config, Backend::Cpu)?.into_node();
//!
//! let server = FrameServer::new();
//! let frames = server.get_frames(&grain, 0..2)?;
//! assert_eq!(frames.len(), 2);
//! # Ok::<(), fgrain_filter::FilterError>(())
//! ```

use std::collections::HashMap;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard};

use rayon::prelude::*;

#[allow(unused_imports)]
use tracing::{debug, trace};

use fgrain_core::Frame;

use crate::node::{Activation, FilterMode, FrameContext, Node, node_id};
use crate::{FilterError, FilterResult};

/// Executes frame requests against a filter graph.
pub struct FrameServer {
    pool: Option<rayon::ThreadPool>,
    serial_locks: Mutex<HashMap<usize, Arc<Mutex<()>>>>,
}

impl Default for FrameServer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameServer {
    /// Server running on the global rayon pool.
    pub fn new() -> Self {
        Self {
            pool: None,
            serial_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Server with its own pool of `threads` workers (0 = rayon default).
    pub fn with_threads(threads: usize) -> FilterResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("fgrain-{i}"))
            .build()?;
        debug!(threads = pool.current_num_threads(), "frame server pool created");
        Ok(Self {
            pool: Some(pool),
            serial_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Number of worker threads requests run on.
    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    /// Produces frame `n` of `node`.
    ///
    /// # Errors
    ///
    /// - [`FilterError::FrameOutOfRange`] if `n` is past the clip end
    /// - [`FilterError::NoOutput`] if the node finishes without a frame
    /// - any error raised by a filter in the chain
    pub fn get_frame(&self, node: &Node, n: usize) -> FilterResult<Frame> {
        self.install(|| self.resolve(node, n))
    }

    /// Produces frames `range` of `node`, in index order.
    ///
    /// Requests run concurrently when every node in the chain is
    /// [`FilterMode::Parallel`], one after another otherwise.
    pub fn get_frames(&self, node: &Node, range: Range<usize>) -> FilterResult<Vec<Frame>> {
        if chain_is_parallel(node) {
            trace!(filter = node.name(), ?range, "parallel batch");
            self.install(|| range.into_par_iter().map(|n| self.resolve(node, n)).collect())
        } else {
            trace!(filter = node.name(), ?range, "sequential batch");
            self.install(|| range.map(|n| self.resolve(node, n)).collect())
        }
    }

    fn resolve(&self, node: &Node, n: usize) -> FilterResult<Frame> {
        let num_frames = node.video_info().num_frames;
        if n >= num_frames {
            return Err(FilterError::FrameOutOfRange { n, num_frames });
        }

        let mut ctx = FrameContext::new(node.name());
        trace!(filter = node.name(), n, "initial");
        let first = self.activate(node, n, Activation::Initial, &mut ctx)?;
        if let Some(frame) = first {
            return Ok(frame);
        }

        let requests = ctx.take_requests();
        if requests.is_empty() {
            return Err(FilterError::NoOutput {
                filter: node.name().to_string(),
                n,
            });
        }

        // A serial node may block on rayon work while holding its lock, so
        // requests reaching one are never left on the queue for stealing.
        let frames: Vec<FilterResult<Frame>> = if requests.iter().all(|(_, upstream)| chain_is_parallel(upstream)) {
            requests
                .par_iter()
                .map(|(m, upstream)| self.resolve(upstream, *m))
                .collect()
        } else {
            requests
                .iter()
                .map(|(m, upstream)| self.resolve(upstream, *m))
                .collect()
        };
        for ((m, upstream), frame) in requests.iter().zip(frames) {
            ctx.supply(*m, upstream, frame?);
        }

        trace!(filter = node.name(), n, "all frames ready");
        self.activate(node, n, Activation::AllFramesReady, &mut ctx)?
            .ok_or_else(|| FilterError::NoOutput {
                filter: node.name().to_string(),
                n,
            })
    }

    /// Calls the filter, serialized for [`FilterMode::Serial`] nodes.
    ///
    /// The lock covers the call only, never the upstream resolution. Any
    /// chain containing a serial node is resolved one request at a time.
    fn activate(
        &self,
        node: &Node,
        n: usize,
        activation: Activation,
        ctx: &mut FrameContext,
    ) -> FilterResult<Option<Frame>> {
        match node.filter_mode() {
            FilterMode::Parallel => node.get_frame(n, activation, ctx),
            FilterMode::Serial => {
                let lock = self.serial_lock(node);
                let _guard = lock_ignoring_poison(&*lock);
                node.get_frame(n, activation, ctx)
            }
        }
    }

    fn serial_lock(&self, node: &Node) -> Arc<Mutex<()>> {
        let mut locks = lock_ignoring_poison(&self.serial_locks);
        Arc::clone(locks.entry(node_id(node)).or_default())
    }
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Whether `node` and everything upstream of it accept concurrent requests.
pub fn chain_is_parallel(node: &Node) -> bool {
    node.filter_mode() == FilterMode::Parallel
        && node.dependencies().iter().all(|dep| chain_is_parallel(&dep.node))
}
