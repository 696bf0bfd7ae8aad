//! Content hashes for comparing rendered frames.
//!
//! Hashes cover the visible samples only, so frames with different row
//! padding but equal content hash the same.

use fgrain_core::Frame;
use sha2::{Digest, Sha256};

/// SHA-256 of one plane's visible `f32` samples, as lowercase hex.
///
/// # Panics
///
/// If the plane is missing or not 32-bit float.
pub fn plane_hash(frame: &Frame, plane: usize) -> String {
    let mut hasher = Sha256::new();
    update_plane(&mut hasher, frame, plane);
    format!("{:x}", hasher.finalize())
}

/// SHA-256 over the format name, dimensions and every plane.
///
/// # Panics
///
/// If any plane is not 32-bit float.
pub fn frame_hash(frame: &Frame) -> String {
    let mut hasher = Sha256::new();
    hasher.update(frame.format().name().as_bytes());
    hasher.update(frame.width(0).to_le_bytes());
    hasher.update(frame.height(0).to_le_bytes());
    for plane in 0..frame.num_planes() {
        update_plane(&mut hasher, frame, plane);
    }
    format!("{:x}", hasher.finalize())
}

fn update_plane(hasher: &mut Sha256, frame: &Frame, plane: usize) {
    let view = frame.plane_f32(plane).expect("float plane");
    for y in 0..view.height() {
        for v in view.row(y) {
            hasher.update(v.to_bits().to_le_bytes());
        }
    }
}
