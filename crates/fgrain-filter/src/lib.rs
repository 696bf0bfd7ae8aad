//! # fgrain-filter
//!
//! Film-grain filter node and the frame server that drives it.
//!
//! # Modules
//!
//! - [`config`] - grain parameters, defaults, YAML configuration
//! - [`node`] - the two-phase filter protocol
//! - [`source`] - in-memory and constant clips
//! - [`grain`] - the [`FilmGrain`] filter
//! - [`server`] - [`FrameServer`], the request scheduler
//! - [`guard`] - sample-format checks
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use fgrain_compute::Backend;
//! use fgrain_core::format::GRAY_S;
//! use fgrain_filter::{BlankClip, FilmGrain, FrameServer, GrainConfig, Node};
//!
//! let clip: Node = Arc::new(BlankClip::new(GRAY_S, 32, 32, 1, 0.5));
//! let config = GrainConfig::from_yaml_str("numIterations: 32\nsigma: 0.6\n")?;
//! let grain = FilmGrain::with_config(clip, &config, Backend::Auto)?.into_node();
//!
//! let frame = FrameServer::new().get_frame(&grain, 0)?;
//! assert_eq!(frame.width(0), 32);
//! # Ok::<(), fgrain_filter::FilterError>(())
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod config;
pub mod grain;
pub mod guard;
pub mod node;
pub mod server;
pub mod source;

pub use config::{GrainConfig, GrainParams, SeedMode};
pub use error::{FilterError, FilterResult};
pub use grain::{FRAME_NUMBER_PROP, FilmGrain};
pub use node::{
    Activation, Filter, FilterDependency, FilterMode, FrameContext, Node, RequestPattern, VideoInfo,
};
pub use server::FrameServer;
pub use source::{BlankClip, ClipSource};
