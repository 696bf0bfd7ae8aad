//! # fgrain-core
//!
//! Core frame types for the fgrain film-grain filter.
//!
//! - [`VideoFormat`] - stream-wide sample format (colour family, sample type, depth)
//! - [`Plane`], [`PlaneView`], [`PlaneViewMut`] - strided single-channel buffers
//! - [`Frame`], [`FrameBuilder`] - reference-counted frames and their writable counterpart
//! - [`FrameProps`] - per-frame metadata
//!
//! ## Crate Structure
//!
//! ```text
//! fgrain-core (this crate)
//!    ^
//!    |
//!    +-- fgrain-compute (grain synthesis kernel, backends)
//!    +-- fgrain-filter  (filter nodes, frame server)
//!    +-- fgrain-cli     (command line)
//! ```
//!
//! Frames follow the usual frameserver model: every plane is a separate
//! buffer with its own stride, frames are immutable once published and
//! shared through `Arc`.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod format;
pub mod frame;
pub mod plane;

pub use error::{Error, Result};
pub use format::{ColorFamily, SampleType, VideoFormat};
pub use frame::{Frame, FrameBuilder, FrameProps, PropValue};
pub use plane::{Plane, PlaneSamples, PlaneView, PlaneViewMut, Sample};

/// Prelude module for convenient imports.
///
/// ```
/// use fgrain_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::format::{ColorFamily, SampleType, VideoFormat};
    pub use crate::frame::{Frame, FrameBuilder, FrameProps, PropValue};
    pub use crate::plane::{Plane, PlaneView, PlaneViewMut, Sample};
}
