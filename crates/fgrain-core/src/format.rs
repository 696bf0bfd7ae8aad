//! Video frame formats.
//!
//! A [`VideoFormat`] describes how every frame of a stream stores its
//! samples: colour family (plane count), sample type, bit depth and chroma
//! subsampling. The grain filter only accepts 32-bit float formats, but the
//! other formats exist so that sources can describe what they carry and get
//! rejected at the boundary.
//!
//! # Usage
//!
//! ```rust
//! use fgrain_core::format::{VideoFormat, GRAY_S, YUV420_P8};
//!
//! assert!(GRAY_S.is_float32());
//! assert_eq!(GRAY_S.num_planes(), 1);
//!
//! // 4:2:0 chroma planes are half size in both directions
//! assert_eq!(YUV420_P8.plane_dims(1, 1920, 1080), (960, 540));
//! assert_eq!(YUV420_P8.name(), "YUV420P8");
//! ```

use std::fmt;

/// Sample storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    /// Unsigned integer samples.
    Integer,
    /// IEEE 754 floating-point samples.
    Float,
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "int"),
            Self::Float => write!(f, "float"),
        }
    }
}

/// Colour family; determines the number of planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorFamily {
    /// Single luma/grey plane.
    Gray,
    /// Three planes: R, G, B.
    Rgb,
    /// Three planes: Y, U, V (U/V may be subsampled).
    Yuv,
}

/// Format shared by all frames of a constant-format stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VideoFormat {
    /// Colour family.
    pub color_family: ColorFamily,
    /// Sample type.
    pub sample_type: SampleType,
    /// Bits per sample (8, 16 or 32).
    pub bits_per_sample: u8,
    /// log2 horizontal chroma subsampling.
    pub sub_sampling_w: u8,
    /// log2 vertical chroma subsampling.
    pub sub_sampling_h: u8,
}

/// 32-bit float greyscale.
pub const GRAY_S: VideoFormat = VideoFormat::new(ColorFamily::Gray, SampleType::Float, 32, 0, 0);
/// 16-bit float greyscale.
pub const GRAY_H: VideoFormat = VideoFormat::new(ColorFamily::Gray, SampleType::Float, 16, 0, 0);
/// 8-bit greyscale.
pub const GRAY_8: VideoFormat = VideoFormat::new(ColorFamily::Gray, SampleType::Integer, 8, 0, 0);
/// 16-bit greyscale.
pub const GRAY_16: VideoFormat = VideoFormat::new(ColorFamily::Gray, SampleType::Integer, 16, 0, 0);
/// Planar 32-bit float RGB.
pub const RGB_S: VideoFormat = VideoFormat::new(ColorFamily::Rgb, SampleType::Float, 32, 0, 0);
/// Planar 8-bit RGB.
pub const RGB_24: VideoFormat = VideoFormat::new(ColorFamily::Rgb, SampleType::Integer, 8, 0, 0);
/// 32-bit float YUV 4:4:4.
pub const YUV444_PS: VideoFormat = VideoFormat::new(ColorFamily::Yuv, SampleType::Float, 32, 0, 0);
/// 8-bit YUV 4:2:0.
pub const YUV420_P8: VideoFormat = VideoFormat::new(ColorFamily::Yuv, SampleType::Integer, 8, 1, 1);

impl VideoFormat {
    /// Creates a format description.
    pub const fn new(
        color_family: ColorFamily,
        sample_type: SampleType,
        bits_per_sample: u8,
        sub_sampling_w: u8,
        sub_sampling_h: u8,
    ) -> Self {
        Self {
            color_family,
            sample_type,
            bits_per_sample,
            sub_sampling_w,
            sub_sampling_h,
        }
    }

    /// Number of planes in a frame of this format.
    #[inline]
    pub const fn num_planes(&self) -> usize {
        match self.color_family {
            ColorFamily::Gray => 1,
            ColorFamily::Rgb | ColorFamily::Yuv => 3,
        }
    }

    /// Bytes needed to store one sample.
    #[inline]
    pub const fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample as usize).div_ceil(8)
    }

    /// Whether samples are exactly 32-bit IEEE floats.
    #[inline]
    pub const fn is_float32(&self) -> bool {
        matches!(self.sample_type, SampleType::Float) && self.bits_per_sample == 32
    }

    /// Dimensions of `plane` for a frame of `width` x `height`.
    ///
    /// Planes 1 and 2 of a YUV format are subsampled; everything else has
    /// the frame dimensions.
    pub const fn plane_dims(&self, plane: usize, width: u32, height: u32) -> (u32, u32) {
        if plane == 0 || !matches!(self.color_family, ColorFamily::Yuv) {
            return (width, height);
        }
        (width >> self.sub_sampling_w, height >> self.sub_sampling_h)
    }

    /// Short format name in the usual frameserver notation (`GrayS`, `RGBS`,
    /// `YUV420P8`, ...).
    pub fn name(&self) -> String {
        let suffix = match (self.sample_type, self.bits_per_sample) {
            (SampleType::Float, 32) => "S".to_string(),
            (SampleType::Float, 16) => "H".to_string(),
            (_, bits) => bits.to_string(),
        };
        match self.color_family {
            ColorFamily::Gray => format!("Gray{suffix}"),
            ColorFamily::Rgb => format!("RGB{suffix}"),
            ColorFamily::Yuv => {
                let sub = match (self.sub_sampling_w, self.sub_sampling_h) {
                    (0, 0) => "444",
                    (1, 0) => "422",
                    (1, 1) => "420",
                    (2, 0) => "411",
                    (2, 2) => "410",
                    _ => "4xx",
                };
                format!("YUV{sub}P{suffix}")
            }
        }
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_planes() {
        assert_eq!(GRAY_S.num_planes(), 1);
        assert_eq!(RGB_S.num_planes(), 3);
        assert_eq!(YUV420_P8.num_planes(), 3);
    }

    #[test]
    fn test_is_float32() {
        assert!(GRAY_S.is_float32());
        assert!(RGB_S.is_float32());
        assert!(YUV444_PS.is_float32());
        assert!(!GRAY_H.is_float32());
        assert!(!GRAY_16.is_float32());
        assert!(!RGB_24.is_float32());
    }

    #[test]
    fn test_bytes_per_sample() {
        assert_eq!(GRAY_8.bytes_per_sample(), 1);
        assert_eq!(GRAY_H.bytes_per_sample(), 2);
        assert_eq!(GRAY_S.bytes_per_sample(), 4);
    }

    #[test]
    fn test_plane_dims() {
        assert_eq!(RGB_S.plane_dims(2, 64, 48), (64, 48));
        assert_eq!(YUV420_P8.plane_dims(0, 64, 48), (64, 48));
        assert_eq!(YUV420_P8.plane_dims(1, 64, 48), (32, 24));
        assert_eq!(YUV420_P8.plane_dims(2, 65, 49), (32, 24));
    }

    #[test]
    fn test_names() {
        assert_eq!(GRAY_S.name(), "GrayS");
        assert_eq!(GRAY_H.to_string(), "GrayH");
        assert_eq!(GRAY_16.name(), "Gray16");
        assert_eq!(RGB_S.name(), "RGBS");
        assert_eq!(YUV444_PS.name(), "YUV444PS");
        assert_eq!(YUV420_P8.name(), "YUV420P8");
    }
}
