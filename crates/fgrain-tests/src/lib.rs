//! Integration tests for the fgrain crates.
//!
//! End-to-end checks that run the grain filter through the frame server
//! and compare results by content hash.

mod fingerprint;

pub use fingerprint::{frame_hash, plane_hash};
