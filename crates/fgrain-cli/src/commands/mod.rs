//! CLI command implementations

pub mod add;
pub mod backends;
pub mod blank;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use fgrain_core::Frame;
use fgrain_filter::FRAME_NUMBER_PROP;

use crate::pfm;
use crate::sequence::{FrameRange, Sequence};

/// Load frame from path
pub fn load_frame(path: &Path) -> Result<Frame> {
    pfm::read(path).with_context(|| format!("Failed to load: {}", path.display()))
}

/// Load frame from path, tagged with its sequence frame number
pub fn load_numbered_frame(path: &Path, number: i32) -> Result<Frame> {
    let frame = load_frame(path)?;
    let mut props = frame.props().clone();
    props.set(FRAME_NUMBER_PROP, i64::from(number));
    Ok(frame.with_props(props))
}

/// Save frame to path
pub fn save_frame(path: &Path, frame: &Frame) -> Result<()> {
    pfm::write(path, frame).with_context(|| format!("Failed to save: {}", path.display()))
}

/// Frame numbers and paths named by a file or sequence argument.
pub struct FrameFiles {
    pub numbers: Vec<i32>,
    pub paths: Vec<PathBuf>,
}

/// Resolves an input argument to the files to read.
///
/// Patterns use `start..=end` when both are given, otherwise the frames
/// found on disk fill in the missing bound.
pub fn input_files(input: &str, start: Option<i32>, end: Option<i32>) -> Result<FrameFiles> {
    if !Sequence::is_pattern(input) {
        if start.is_some() || end.is_some() {
            tracing::warn!(input, "--start/--end ignored for a single file");
        }
        return Ok(FrameFiles {
            numbers: vec![1],
            paths: vec![PathBuf::from(input)],
        });
    }

    let seq = Sequence::from_pattern(input)?;
    let range = match (start, end) {
        (Some(s), Some(e)) => FrameRange::new(s, e),
        _ => {
            let found = seq
                .scan()?
                .with_context(|| format!("No frames found for {seq}"))?;
            FrameRange::new(start.unwrap_or(found.start()), end.unwrap_or(found.end()))
        }
    };
    tracing::debug!(sequence = %seq, %range, "input sequence");

    Ok(FrameFiles {
        numbers: range.iter().collect(),
        paths: range.iter().map(|f| seq.frame_path(f)).collect(),
    })
}

/// Output paths for the given frame numbers.
pub fn output_paths(output: &str, numbers: &[i32]) -> Result<Vec<PathBuf>> {
    if Sequence::is_pattern(output) {
        let seq = Sequence::from_pattern(output)?;
        return Ok(numbers.iter().map(|&f| seq.frame_path(f)).collect());
    }
    if numbers.len() > 1 {
        bail!(
            "{} frames need an output pattern (#### or %04d), got {}",
            numbers.len(),
            output
        );
    }
    Ok(vec![PathBuf::from(output)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_file() {
        let files = input_files("plate.pfm", None, None).unwrap();
        assert_eq!(files.numbers, vec![1]);
        assert_eq!(files.paths, vec![PathBuf::from("plate.pfm")]);
        assert_eq!(output_paths("out.pfm", &files.numbers).unwrap(), vec![PathBuf::from("out.pfm")]);
    }

    #[test]
    fn test_explicit_range() {
        let files = input_files("in.%03d.pfm", Some(8), Some(10)).unwrap();
        assert_eq!(files.numbers, vec![8, 9, 10]);
        assert_eq!(files.paths[0], PathBuf::from("in.008.pfm"));

        let out = output_paths("out.####.pfm", &files.numbers).unwrap();
        assert_eq!(out[2], PathBuf::from("out.0010.pfm"));
        assert!(output_paths("out.pfm", &files.numbers).is_err());
    }

    #[test]
    fn test_scanned_range() {
        let dir = tempfile::tempdir().unwrap();
        for f in 20..=23 {
            std::fs::write(dir.path().join(format!("p.{f}.pfm")), b"").unwrap();
        }
        let pattern = dir.path().join("p.##.pfm");
        let files = input_files(pattern.to_str().unwrap(), Some(21), None).unwrap();
        assert_eq!(files.numbers, vec![21, 22, 23]);

        let missing = dir.path().join("q.##.pfm");
        assert!(input_files(missing.to_str().unwrap(), None, None).is_err());
    }

    #[test]
    fn test_load_numbered_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.1042.pfm");
        save_frame(&path, &Frame::filled(fgrain_core::format::GRAY_S, 3, 2, 0.5)).unwrap();

        let frame = load_numbered_frame(&path, 1042).unwrap();
        assert_eq!(frame.props().get_int(FRAME_NUMBER_PROP), Some(1042));
        assert_eq!(frame.plane_f32(0).unwrap().get(2, 1), 0.5);
    }
}
