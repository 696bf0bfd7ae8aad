//! Error types for fgrain-core operations.
//!
//! The [`Error`] enum covers the failure modes of frame and plane handling:
//! - Plane buffer construction (dimensions, stride, buffer length)
//! - Typed sample access on planes of another sample type
//! - Plane indexing
//! - I/O (used by readers/writers built on top of the core types)
//!
//! # Usage
//!
//! ```rust
//! use fgrain_core::{Error, Result};
//!
//! fn check_stride(stride: usize, width: u32) -> Result<()> {
//!     if stride < width as usize {
//!         return Err(Error::InvalidStride {
//!             stride,
//!             min_stride: width as usize,
//!             width,
//!         });
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::format::SampleType;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or accessing frames.
///
/// # Categories
///
/// - **Dimension errors**: [`InvalidDimensions`](Error::InvalidDimensions), [`InvalidStride`](Error::InvalidStride)
/// - **Buffer errors**: [`BufferSizeMismatch`](Error::BufferSizeMismatch)
/// - **Access errors**: [`PlaneOutOfRange`](Error::PlaneOutOfRange), [`SampleTypeMismatch`](Error::SampleTypeMismatch)
/// - **I/O errors**: [`Io`](Error::Io)
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid plane or frame dimensions.
    ///
    /// Returned when width or height is zero, or the dimensions would
    /// overflow buffer size calculations.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Reason why dimensions are invalid
        reason: String,
    },

    /// Stride (in samples) is smaller than the row width.
    #[error("stride {stride} is less than minimum {min_stride} for width {width}")]
    InvalidStride {
        /// Provided stride
        stride: usize,
        /// Minimum required stride
        min_stride: usize,
        /// Plane width
        width: u32,
    },

    /// Buffer length doesn't match `stride * height`.
    #[error("buffer size mismatch: expected {expected} samples, got {actual}")]
    BufferSizeMismatch {
        /// Required number of samples
        expected: usize,
        /// Provided number of samples
        actual: usize,
    },

    /// Plane index is not present in the frame.
    #[error("plane {plane} out of range for frame with {num_planes} planes")]
    PlaneOutOfRange {
        /// Requested plane
        plane: usize,
        /// Number of planes in the frame
        num_planes: usize,
    },

    /// Typed access asked for a sample type the plane doesn't store.
    #[error("sample type mismatch: expected {expected}, plane holds {actual}")]
    SampleTypeMismatch {
        /// Requested sample type description
        expected: String,
        /// Stored sample type description
        actual: String,
    },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::SampleTypeMismatch`] error.
    #[inline]
    pub fn sample_type_mismatch(
        expected: (SampleType, u8),
        actual: (SampleType, u8),
    ) -> Self {
        Self::SampleTypeMismatch {
            expected: format!("{}{}", expected.0, expected.1),
            actual: format!("{}{}", actual.0, actual.1),
        }
    }

    /// Returns `true` if this is an I/O error.
    #[inline]
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_stride_message() {
        let err = Error::InvalidStride {
            stride: 10,
            min_stride: 16,
            width: 16,
        };
        let msg = err.to_string();
        assert!(msg.contains("10"));
        assert!(msg.contains("16"));
    }

    #[test]
    fn test_sample_type_mismatch() {
        let err = Error::sample_type_mismatch((SampleType::Float, 32), (SampleType::Integer, 8));
        let msg = err.to_string();
        assert!(msg.contains("float32"));
        assert!(msg.contains("int8"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.is_io_error());
    }
}
