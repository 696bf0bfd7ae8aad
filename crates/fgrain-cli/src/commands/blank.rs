//! Blank command
//!
//! Writes constant-valued float frames, handy as grain test plates.

use anyhow::{Result, bail};
#[allow(unused_imports)]
use tracing::{debug, info, trace};

use fgrain_core::Frame;
use fgrain_core::format::{GRAY_S, RGB_S};

use crate::BlankArgs;

pub fn run(args: BlankArgs, verbose: u8) -> Result<()> {
    trace!(output = %args.output, width = args.width, height = args.height, "blank::run");

    if args.width == 0 || args.height == 0 {
        bail!("Frame size must be non-zero, got {}x{}", args.width, args.height);
    }
    let format = if args.rgb { RGB_S } else { GRAY_S };
    let frame = Frame::filled(format, args.width, args.height, args.value);

    let numbers = frame_numbers(args.start, args.frames)?;
    let paths = super::output_paths(&args.output, &numbers)?;
    info!(format = %format, frames = paths.len(), value = args.value, "Writing blank frames");

    for path in &paths {
        super::save_frame(path, &frame)?;
        if verbose > 0 {
            println!("{}", path.display());
        }
    }

    Ok(())
}

/// `frames` consecutive numbers starting at `start`.
fn frame_numbers(start: i32, frames: usize) -> Result<Vec<i32>> {
    if frames == 0 {
        bail!("--frames must be at least 1");
    }
    let Some(last) = i32::try_from(frames - 1).ok().and_then(|n| start.checked_add(n)) else {
        bail!("--frames {frames} from --start {start} exceeds the frame number range");
    };
    Ok((start..=last).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_numbers() {
        assert_eq!(frame_numbers(1, 3).unwrap(), vec![1, 2, 3]);
        assert_eq!(frame_numbers(-2, 2).unwrap(), vec![-2, -1]);
        assert_eq!(frame_numbers(i32::MAX, 1).unwrap(), vec![i32::MAX]);
        assert!(frame_numbers(1, 0).is_err());
    }

    #[test]
    fn test_frame_numbers_overflow() {
        assert!(frame_numbers(i32::MAX, 2).is_err());
        assert!(frame_numbers(0, usize::MAX).is_err());
        assert!(frame_numbers(0, i32::MAX as usize + 2).is_err());
    }
}
