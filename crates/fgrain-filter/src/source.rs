//! Source nodes.

use fgrain_core::{Frame, VideoFormat};

#[allow(unused_imports)]
use tracing::{debug, trace};

use crate::node::{Activation, Filter, FrameContext, VideoInfo};
use crate::{FilterError, FilterResult};

/// Clip backed by an in-memory list of frames.
///
/// The clip reports a constant format only when every frame shares the
/// format and dimensions of the first one.
pub struct ClipSource {
    info: VideoInfo,
    frames: Vec<Frame>,
}

impl ClipSource {
    /// Wraps `frames` as a clip.
    pub fn new(frames: Vec<Frame>) -> Self {
        let info = match frames.first() {
            Some(first) => {
                let (format, width, height) = (first.format(), first.width(0), first.height(0));
                let constant = frames
                    .iter()
                    .all(|f| f.format() == format && f.width(0) == width && f.height(0) == height);
                if constant {
                    VideoInfo::new(format, width, height, frames.len())
                } else {
                    debug!(frames = frames.len(), "clip source has variable format");
                    VideoInfo::variable(frames.len())
                }
            }
            None => VideoInfo::variable(0),
        };
        Self { info, frames }
    }

    /// Sets the reported frame rate.
    pub fn with_fps(mut self, num: u64, den: u64) -> Self {
        self.info = self.info.with_fps(num, den);
        self
    }
}

impl Filter for ClipSource {
    fn name(&self) -> &str {
        "ClipSource"
    }

    fn video_info(&self) -> &VideoInfo {
        &self.info
    }

    fn get_frame(&self, n: usize, _activation: Activation, _ctx: &mut FrameContext) -> FilterResult<Option<Frame>> {
        self.frames
            .get(n)
            .cloned()
            .map(Some)
            .ok_or(FilterError::FrameOutOfRange {
                n,
                num_frames: self.frames.len(),
            })
    }
}

/// Clip of identical constant-valued frames.
pub struct BlankClip {
    info: VideoInfo,
    frame: Frame,
}

impl BlankClip {
    /// `num_frames` frames of `format` at `width` x `height`, every sample
    /// set to `value`.
    pub fn new(format: VideoFormat, width: u32, height: u32, num_frames: usize, value: f32) -> Self {
        Self {
            info: VideoInfo::new(format, width, height, num_frames),
            frame: Frame::filled(format, width, height, value),
        }
    }
}

impl Filter for BlankClip {
    fn name(&self) -> &str {
        "BlankClip"
    }

    fn video_info(&self) -> &VideoInfo {
        &self.info
    }

    fn get_frame(&self, n: usize, _activation: Activation, _ctx: &mut FrameContext) -> FilterResult<Option<Frame>> {
        if n >= self.info.num_frames {
            return Err(FilterError::FrameOutOfRange {
                n,
                num_frames: self.info.num_frames,
            });
        }
        Ok(Some(self.frame.clone()))
    }
}
