//! Error types for filter construction and frame requests.

use std::path::PathBuf;

use fgrain_compute::ComputeError;
use thiserror::Error;

/// Error type for filters and the frame server.
#[derive(Error, Debug)]
pub enum FilterError {
    /// Upstream clip is not a constant 32-bit float format.
    #[error("{filter}: only 32-bit float input supported")]
    UnsupportedFormat {
        /// Filter that rejected the clip.
        filter: String,
        /// Format reported by the upstream clip.
        found: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name as written in configuration.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A delivered frame does not have the format the clip promised.
    #[error("{filter}: frame {n} plane {plane} has format {format}, expected 32-bit float")]
    FrameFormatMismatch {
        /// Filter that received the frame.
        filter: String,
        /// Frame index.
        n: usize,
        /// Offending plane.
        plane: usize,
        /// Actual frame format.
        format: String,
    },

    /// Requested frame index past the end of the clip.
    #[error("frame {n} out of range (clip has {num_frames} frames)")]
    FrameOutOfRange {
        /// Requested index.
        n: usize,
        /// Clip length.
        num_frames: usize,
    },

    /// A filter asked for a frame it never requested.
    #[error("{filter}: frame {n} was not requested from {node}")]
    MissingFrame {
        /// Filter asking for the frame.
        filter: String,
        /// Frame index.
        n: usize,
        /// Upstream node name.
        node: String,
    },

    /// A filter finished a request without producing a frame.
    #[error("{filter}: no frame produced for request {n}")]
    NoOutput {
        /// Filter name.
        filter: String,
        /// Frame index.
        n: usize,
    },

    /// Configuration file not found.
    #[error("config file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched.
        path: PathBuf,
    },

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Worker pool could not be created.
    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Frame or plane error.
    #[error(transparent)]
    Core(#[from] fgrain_core::Error),

    /// Grain synthesis failed.
    #[error(transparent)]
    Compute(#[from] ComputeError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FilterError {
    /// Creates an invalid-parameter error.
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;
