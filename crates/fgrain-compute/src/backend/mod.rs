//! Compute backends for grain synthesis.
//!
//! Provides a rayon CPU backend and a single-threaded scalar reference,
//! with automatic selection.
//!
//! # Architecture
//!
//! ```text
//! dyn GrainBackend
//!     +-- CpuBackend    (rayon, one task per row)
//!     +-- ScalarBackend (plain loop)
//! ```
//!
//! Both backends evaluate the same [`GrainModel`](crate::GrainModel), so a
//! plane renders to the same bits whichever one is chosen.

mod cpu_backend;
mod detect;
mod scalar_backend;

pub use cpu_backend::CpuBackend;
pub use detect::{BackendInfo, describe_backends, detect_backends, select_best_backend};
pub use scalar_backend::ScalarBackend;

use std::str::FromStr;
use std::sync::Arc;

use fgrain_core::{PlaneView, PlaneViewMut};

use crate::kernel::KernelParams;
use crate::{ComputeError, ComputeResult};

/// Available compute backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Auto-select best available.
    #[default]
    Auto,
    /// CPU backend using rayon for parallelization.
    Cpu,
    /// Single-threaded reference backend.
    Scalar,
}

impl Backend {
    /// Check if this backend is available on current system.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Auto | Self::Cpu | Self::Scalar => true,
        }
    }

    /// Get human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Scalar => "scalar",
        }
    }
}

impl FromStr for Backend {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" | "rayon" => Ok(Self::Cpu),
            "scalar" | "reference" => Ok(Self::Scalar),
            other => Err(ComputeError::BackendNotAvailable(format!(
                "unknown backend '{other}' (expected auto, cpu or scalar)"
            ))),
        }
    }
}

/// Grain synthesis on one plane.
///
/// Implementations render every visible sample of `dst` from `src` and
/// must be deterministic: the result may depend only on the source plane
/// and `params`, never on scheduling. Calls are synchronous; the plane
/// buffers are only borrowed for the duration of the call.
pub trait GrainBackend: Send + Sync {
    /// Backend name.
    fn name(&self) -> &'static str;

    /// Renders grain for `src` into `dst`.
    ///
    /// # Errors
    ///
    /// - [`ComputeError::DimensionMismatch`] if the planes differ in size
    /// - [`ComputeError::InvalidParameter`] for an invalid grain model
    fn synthesize(
        &self,
        src: PlaneView<'_, f32>,
        dst: PlaneViewMut<'_, f32>,
        params: &KernelParams,
    ) -> ComputeResult<()>;
}

/// Checks that source and destination agree; `false` means nothing to do.
pub(crate) fn check_planes(src: &PlaneView<'_, f32>, dst: &PlaneViewMut<'_, f32>) -> ComputeResult<bool> {
    if src.width() != dst.width() || src.height() != dst.height() {
        return Err(ComputeError::DimensionMismatch {
            src_width: src.width(),
            src_height: src.height(),
            dst_width: dst.width(),
            dst_height: dst.height(),
        });
    }
    Ok(!src.is_empty())
}

/// Create a backend instance.
pub fn create_backend(backend: Backend) -> ComputeResult<Arc<dyn GrainBackend>> {
    match backend {
        Backend::Auto => {
            let best = select_best_backend();
            create_backend(best)
        }
        Backend::Cpu => Ok(Arc::new(CpuBackend::new())),
        Backend::Scalar => Ok(Arc::new(ScalarBackend::new())),
    }
}
