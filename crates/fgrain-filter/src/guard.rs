//! Sample-format guards.
//!
//! The grain kernel works on 32-bit float samples only. Clips are checked
//! once when a filter is built; frames are checked again when they arrive,
//! since a source can misreport its format.
//!
//! # Example
//!
//! ```rust
//! use fgrain_core::format::{GRAY_16, GRAY_S};
//! use fgrain_filter::guard::ensure_float32_clip;
//! use fgrain_filter::VideoInfo;
//!
//! assert!(ensure_float32_clip(&VideoInfo::new(GRAY_S, 8, 8, 1), "FilmGrain").is_ok());
//! assert!(ensure_float32_clip(&VideoInfo::new(GRAY_16, 8, 8, 1), "FilmGrain").is_err());
//! ```

use fgrain_core::{Frame, SampleType};

use crate::{FilterError, FilterResult, VideoInfo};

/// Validates that a clip has a constant, 32-bit float format.
///
/// # Errors
///
/// [`FilterError::UnsupportedFormat`] for variable-format clips and for
/// any integer or half-float format.
pub fn ensure_float32_clip(info: &VideoInfo, filter: &str) -> FilterResult<()> {
    match info.format {
        Some(format) if info.is_constant_format() && format.is_float32() => Ok(()),
        _ => Err(FilterError::UnsupportedFormat {
            filter: filter.to_string(),
            found: info.format_name(),
        }),
    }
}

/// Validates that `plane` of frame `n` holds 32-bit float samples.
pub fn ensure_float32_plane(frame: &Frame, plane: usize, filter: &str, n: usize) -> FilterResult<()> {
    let kind = frame.plane(plane)?.samples().sample_kind();
    if kind != (SampleType::Float, 32) {
        return Err(FilterError::FrameFormatMismatch {
            filter: filter.to_string(),
            n,
            plane,
            format: frame.format().name(),
        });
    }
    Ok(())
}
