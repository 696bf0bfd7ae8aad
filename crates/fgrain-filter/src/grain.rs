//! The film-grain filter node.
//!
//! Each output frame has the shape, format and properties of the upstream
//! frame with the same index; every plane is replaced by its synthesized
//! grain rendition.
//!
//! With [`SeedMode::PerFrame`](crate::SeedMode::PerFrame) the seed follows
//! the source frame's [`FRAME_NUMBER_PROP`] when present, and the clip
//! index otherwise.

use std::sync::Arc;

use fgrain_compute::{Backend, GrainBackend, create_backend};
use fgrain_core::{Frame, FrameBuilder};

#[allow(unused_imports)]
use tracing::{debug, trace};

use crate::config::{GrainConfig, GrainParams};
use crate::guard::{ensure_float32_clip, ensure_float32_plane};
use crate::node::{Activation, Filter, FilterDependency, FrameContext, Node, RequestPattern, VideoInfo};
use crate::FilterResult;

/// Integer frame property carrying a frame's number in its sequence.
pub const FRAME_NUMBER_PROP: &str = "_FrameNumber";

/// Film-grain synthesis on a float clip.
pub struct FilmGrain {
    upstream: Node,
    info: VideoInfo,
    params: GrainParams,
    backend: Arc<dyn GrainBackend>,
}

impl FilmGrain {
    /// Filter name.
    pub const NAME: &'static str = "FilmGrain";

    /// Builds the filter.
    ///
    /// # Errors
    ///
    /// [`FilterError::UnsupportedFormat`](crate::FilterError::UnsupportedFormat)
    /// unless `upstream` is a constant-format 32-bit float clip. The
    /// upstream handle is released with the failed constructor.
    pub fn new(upstream: Node, params: GrainParams, backend: Arc<dyn GrainBackend>) -> FilterResult<Self> {
        ensure_float32_clip(upstream.video_info(), Self::NAME)?;
        let info = upstream.video_info().clone();
        debug!(
            format = %info.format_name(),
            width = info.width,
            height = info.height,
            frames = info.num_frames,
            backend = backend.name(),
            "FilmGrain created"
        );
        Ok(Self {
            upstream,
            info,
            params,
            backend,
        })
    }

    /// Resolves `config` and creates the requested backend.
    pub fn with_config(upstream: Node, config: &GrainConfig, backend: Backend) -> FilterResult<Self> {
        let params = config.resolve()?;
        let backend = create_backend(backend)?;
        Self::new(upstream, params, backend)
    }

    /// Wraps the filter as a graph node.
    pub fn into_node(self) -> Node {
        Arc::new(self)
    }

    /// Resolved parameters.
    pub fn params(&self) -> &GrainParams {
        &self.params
    }

    /// Name of the compute backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn render(&self, n: usize, src: &Frame) -> FilterResult<Frame> {
        for plane in 0..src.num_planes() {
            ensure_float32_plane(src, plane, Self::NAME, n)?;
        }

        // negative frame numbers wrap
        let frame_number = src
            .props()
            .get_int(FRAME_NUMBER_PROP)
            .map(|v| v as u64)
            .unwrap_or(n as u64);

        let mut dst = FrameBuilder::new_like(src);
        for plane in 0..src.num_planes() {
            let params = self.params.kernel_params(frame_number, plane as u32);
            trace!(n, frame_number, plane, seed = params.seed, "synthesize plane");
            self.backend
                .synthesize(src.plane_f32(plane)?, dst.plane_f32_mut(plane)?, &params)?;
        }
        Ok(dst.freeze())
    }
}

impl Filter for FilmGrain {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn video_info(&self) -> &VideoInfo {
        &self.info
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
                let src = ctx.take_frame(n, &self.upstream)?;
                self.render(n, &src).map(Some)
            }
        }
    }
}
