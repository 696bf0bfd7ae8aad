//! Film-grain synthesis kernel and compute backends.
//!
//! Renders the grain of one plane at a time with a Boolean model of
//! randomly placed discs whose density follows the local intensity, and
//! estimates per-pixel coverage by Monte Carlo integration.
//!
//! # Architecture
//!
//! ```text
//! GrainBackend (synthesize contract)
//!     ├── CpuBackend    (rayon, rows in parallel)
//!     └── ScalarBackend (single thread, reference)
//!             └── GrainModel (kernel.rs)
//!                     └── GrainRng / hash (rng.rs)
//! ```
//!
//! Every backend renders through the same [`GrainModel`], so outputs are
//! bit-identical across backends and thread counts.
//!
//! # Example
//!
//! ```
//! use fgrain_compute::{Backend, KernelParams, create_backend};
//! use fgrain_core::{PlaneView, PlaneViewMut};
//!
//! let src = vec![0.5f32; 16 * 16];
//! let mut dst = vec![0.0f32; 16 * 16];
//!
//! let backend = create_backend(Backend::Cpu)?;
//! let params = KernelParams { num_iterations: 32, ..KernelParams::default() };
//! backend.synthesize(
//!     PlaneView::new(&src, 16, 16, 16)?,
//!     PlaneViewMut::new(&mut dst, 16, 16, 16)?,
//!     &params,
//! )?;
//! assert!(dst.iter().all(|v| v.is_finite()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backend;
pub mod kernel;
pub mod rng;

pub use backend::{
    Backend, BackendInfo, CpuBackend, GrainBackend, ScalarBackend, create_backend,
    describe_backends, detect_backends, select_best_backend,
};
pub use kernel::{GrainModel, KernelParams, MAX_CELLS_PER_TRIAL, RangePolicy};
pub use rng::{GrainRng, hash, mix_seed};

use thiserror::Error;

/// Compute errors.
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Plane size mismatch: source {src_width}x{src_height}, destination {dst_width}x{dst_height}")]
    DimensionMismatch {
        src_width: u32,
        src_height: u32,
        dst_width: u32,
        dst_height: u32,
    },

    #[error("Invalid kernel parameter: {0}")]
    InvalidParameter(String),

    #[error("Compute operation failed: {0}")]
    OperationFailed(String),

    #[error(transparent)]
    Core(#[from] fgrain_core::Error),
}

pub type ComputeResult<T> = Result<T, ComputeError>;
