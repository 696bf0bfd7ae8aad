//! Reference-counted video frames.
//!
//! - [`Frame`] - immutable, cheaply clonable handle shared between the
//!   producer, the frame server and any number of consumers
//! - [`FrameBuilder`] - exclusively owned frame under construction; the
//!   only place samples are written
//! - [`FrameProps`] - per-frame metadata carried from source to output
//!
//! A frame is written exactly once: a filter allocates a [`FrameBuilder`]
//! (usually with [`FrameBuilder::new_like`] so the source's properties
//! travel along), fills its planes and calls [`FrameBuilder::freeze`].
//!
//! # Example
//!
//! ```rust
//! use fgrain_core::{Frame, FrameBuilder, format::GRAY_S};
//!
//! let src = Frame::filled(GRAY_S, 8, 8, 0.5);
//! let mut dst = FrameBuilder::new_like(&src);
//! dst.plane_f32_mut(0).unwrap().row_mut(0).fill(1.0);
//! let dst = dst.freeze();
//!
//! assert_eq!(dst.width(0), 8);
//! assert_eq!(dst.plane_f32(0).unwrap().get(3, 0), 1.0);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::format::VideoFormat;
use crate::plane::{Plane, PlaneView, PlaneViewMut, Sample};
use crate::{Error, Result};

/// A single frame property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// Integer property.
    Int(i64),
    /// Float property.
    Float(f64),
    /// String property.
    Str(String),
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Ordered frame metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameProps {
    values: BTreeMap<String, PropValue>,
}

impl FrameProps {
    /// Empty property map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Looks up `key`.
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.values.get(key)
    }

    /// Integer value of `key`, if present and an integer.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(PropValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Removes `key`.
    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        self.values.remove(key)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no properties.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

struct FrameData {
    format: VideoFormat,
    planes: Vec<Plane>,
    props: FrameProps,
}

/// Immutable, reference-counted video frame.
///
/// Cloning shares the underlying planes. Frames are released when the last
/// handle is dropped.
#[derive(Clone)]
pub struct Frame {
    inner: Arc<FrameData>,
}

impl Frame {
    /// Assembles a frame from planes.
    ///
    /// # Errors
    ///
    /// - [`Error::PlaneOutOfRange`] if the plane count doesn't match the format
    /// - [`Error::InvalidDimensions`] if a plane has the wrong size for the
    ///   format's subsampling
    /// - [`Error::SampleTypeMismatch`] if a plane stores another sample type
    pub fn from_planes(format: VideoFormat, planes: Vec<Plane>, props: FrameProps) -> Result<Self> {
        if planes.len() != format.num_planes() {
            return Err(Error::PlaneOutOfRange {
                plane: planes.len(),
                num_planes: format.num_planes(),
            });
        }
        let (width, height) = planes
            .first()
            .map(|p| (p.width(), p.height()))
            .unwrap_or((0, 0));
        for (i, plane) in planes.iter().enumerate() {
            let expected = format.plane_dims(i, width, height);
            if (plane.width(), plane.height()) != expected {
                return Err(Error::invalid_dimensions(
                    plane.width(),
                    plane.height(),
                    format!("plane {i} of {format} must be {}x{}", expected.0, expected.1),
                ));
            }
            let kind = plane.samples().sample_kind();
            if kind != (format.sample_type, format.bits_per_sample) {
                return Err(Error::sample_type_mismatch(
                    (format.sample_type, format.bits_per_sample),
                    kind,
                ));
            }
        }
        Ok(Self {
            inner: Arc::new(FrameData {
                format,
                planes,
                props,
            }),
        })
    }

    /// Constant frame: every sample of every plane set to `value`.
    ///
    /// Integer formats receive `value` scaled to their full range; use
    /// [`FrameBuilder`] for anything more specific.
    pub fn filled(format: VideoFormat, width: u32, height: u32, value: f32) -> Self {
        FrameBuilder::with_fill(format, width, height, value).freeze()
    }

    /// Frame format.
    #[inline]
    pub fn format(&self) -> VideoFormat {
        self.inner.format
    }

    /// Number of planes.
    #[inline]
    pub fn num_planes(&self) -> usize {
        self.inner.planes.len()
    }

    /// Width of `plane` (0 if the plane doesn't exist).
    #[inline]
    pub fn width(&self, plane: usize) -> u32 {
        self.inner.planes.get(plane).map_or(0, Plane::width)
    }

    /// Height of `plane` (0 if the plane doesn't exist).
    #[inline]
    pub fn height(&self, plane: usize) -> u32 {
        self.inner.planes.get(plane).map_or(0, Plane::height)
    }

    /// Stride of `plane` in samples (0 if the plane doesn't exist).
    #[inline]
    pub fn stride(&self, plane: usize) -> usize {
        self.inner.planes.get(plane).map_or(0, Plane::stride)
    }

    /// Borrows a plane.
    pub fn plane(&self, plane: usize) -> Result<&Plane> {
        self.inner.planes.get(plane).ok_or(Error::PlaneOutOfRange {
            plane,
            num_planes: self.inner.planes.len(),
        })
    }

    /// Typed read-only view of a plane.
    pub fn plane_view<T: Sample>(&self, plane: usize) -> Result<PlaneView<'_, T>> {
        self.plane(plane)?.view::<T>()
    }

    /// Read-only `f32` view of a plane.
    #[inline]
    pub fn plane_f32(&self, plane: usize) -> Result<PlaneView<'_, f32>> {
        self.plane_view::<f32>(plane)
    }

    /// Frame properties.
    #[inline]
    pub fn props(&self) -> &FrameProps {
        &self.inner.props
    }

    /// This frame with its properties replaced.
    ///
    /// Planes are moved when this is the only handle and copied otherwise.
    pub fn with_props(self, props: FrameProps) -> Self {
        let mut data = Arc::try_unwrap(self.inner).unwrap_or_else(|shared| FrameData {
            format: shared.format,
            planes: shared.planes.clone(),
            props: FrameProps::new(),
        });
        data.props = props;
        Self { inner: Arc::new(data) }
    }

    /// Whether two handles refer to the same frame allocation.
    #[inline]
    pub fn ptr_eq(&self, other: &Frame) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("format", &self.format().name())
            .field("width", &self.width(0))
            .field("height", &self.height(0))
            .field("planes", &self.num_planes())
            .field("props", &self.props().len())
            .finish()
    }
}

/// Writable frame under construction.
pub struct FrameBuilder {
    format: VideoFormat,
    planes: Vec<Plane>,
    props: FrameProps,
}

impl FrameBuilder {
    /// Allocates a zeroed frame of `format` and luma size `width` x `height`.
    pub fn new(format: VideoFormat, width: u32, height: u32) -> Self {
        Self::with_fill(format, width, height, 0.0)
    }

    /// Allocates a frame with the same format, dimensions and properties as
    /// `src`. Samples are zeroed.
    pub fn new_like(src: &Frame) -> Self {
        let mut builder = Self::new(src.format(), src.width(0), src.height(0));
        builder.props = src.props().clone();
        builder
    }

    fn with_fill(format: VideoFormat, width: u32, height: u32, value: f32) -> Self {
        let planes = (0..format.num_planes())
            .map(|i| {
                let (w, h) = format.plane_dims(i, width, height);
                match (format.sample_type, format.bits_per_sample) {
                    (crate::SampleType::Float, 16) => {
                        Plane::filled(w, h, half::f16::from_f32(value))
                    }
                    (crate::SampleType::Float, _) => Plane::filled(w, h, value),
                    (crate::SampleType::Integer, 8) => {
                        Plane::filled(w, h, (value.clamp(0.0, 1.0) * 255.0).round() as u8)
                    }
                    (crate::SampleType::Integer, _) => {
                        Plane::filled(w, h, (value.clamp(0.0, 1.0) * 65535.0).round() as u16)
                    }
                }
            })
            .collect();
        Self {
            format,
            planes,
            props: FrameProps::new(),
        }
    }

    /// Frame format.
    #[inline]
    pub fn format(&self) -> VideoFormat {
        self.format
    }

    /// Number of planes.
    #[inline]
    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    /// Typed mutable view of a plane.
    pub fn plane_view_mut<T: Sample>(&mut self, plane: usize) -> Result<PlaneViewMut<'_, T>> {
        let num_planes = self.planes.len();
        self.planes
            .get_mut(plane)
            .ok_or(Error::PlaneOutOfRange { plane, num_planes })?
            .view_mut::<T>()
    }

    /// Mutable `f32` view of a plane.
    #[inline]
    pub fn plane_f32_mut(&mut self, plane: usize) -> Result<PlaneViewMut<'_, f32>> {
        self.plane_view_mut::<f32>(plane)
    }

    /// Mutable properties.
    #[inline]
    pub fn props_mut(&mut self) -> &mut FrameProps {
        &mut self.props
    }

    /// Finishes construction and returns the shared, immutable frame.
    pub fn freeze(self) -> Frame {
        Frame {
            inner: Arc::new(FrameData {
                format: self.format,
                planes: self.planes,
                props: self.props,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{GRAY_8, GRAY_S, RGB_S, YUV420_P8};

    #[test]
    fn test_filled_frame_shape() {
        let frame = Frame::filled(RGB_S, 17, 9, 0.5);
        assert_eq!(frame.num_planes(), 3);
        for p in 0..3 {
            assert_eq!(frame.width(p), 17);
            assert_eq!(frame.height(p), 9);
            assert!(frame.stride(p) >= 17);
            assert_eq!(frame.plane_f32(p).unwrap().get(16, 8), 0.5);
        }
    }

    #[test]
    fn test_subsampled_planes() {
        let frame = Frame::filled(YUV420_P8, 64, 32, 1.0);
        assert_eq!((frame.width(1), frame.height(1)), (32, 16));
        assert_eq!(frame.plane_view::<u8>(2).unwrap().get(0, 0), 255);
        assert!(frame.plane_f32(0).is_err());
    }

    #[test]
    fn test_new_like_copies_props() {
        let mut builder = FrameBuilder::new(GRAY_S, 4, 4);
        builder.props_mut().set("_FrameNumber", 7i64);
        builder.props_mut().set("_Matrix", "bt709");
        let src = builder.freeze();

        let dst = FrameBuilder::new_like(&src).freeze();
        assert_eq!(dst.props().get_int("_FrameNumber"), Some(7));
        assert_eq!(dst.props().get("_Matrix"), Some(&PropValue::from("bt709")));
        assert!(!dst.ptr_eq(&src));
    }

    #[test]
    fn test_with_props() {
        let mut props = FrameProps::new();
        props.set("_FrameNumber", 12i64);

        let shared = Frame::filled(GRAY_S, 4, 4, 0.25);
        let other = shared.clone();
        let tagged = shared.with_props(props.clone());
        assert_eq!(tagged.props().get_int("_FrameNumber"), Some(12));
        assert_eq!(other.props().get_int("_FrameNumber"), None);
        assert_eq!(tagged.plane_f32(0).unwrap().get(3, 3), 0.25);

        let sole = Frame::filled(GRAY_S, 2, 2, 0.5).with_props(props);
        assert_eq!(sole.props().get_int("_FrameNumber"), Some(12));
    }

    #[test]
    fn test_clone_shares_data() {
        let frame = Frame::filled(GRAY_8, 4, 4, 0.0);
        let other = frame.clone();
        assert!(frame.ptr_eq(&other));
    }

    #[test]
    fn test_from_planes_validation() {
        let planes = vec![Plane::new::<f32>(4, 4)];
        assert!(Frame::from_planes(GRAY_S, planes.clone(), FrameProps::new()).is_ok());

        let err = Frame::from_planes(RGB_S, planes, FrameProps::new()).unwrap_err();
        assert!(matches!(err, Error::PlaneOutOfRange { .. }));

        let err = Frame::from_planes(GRAY_S, vec![Plane::new::<u8>(4, 4)], FrameProps::new())
            .unwrap_err();
        assert!(matches!(err, Error::SampleTypeMismatch { .. }));

        let planes = vec![Plane::new::<f32>(4, 4), Plane::new::<f32>(4, 4), Plane::new::<f32>(2, 4)];
        let err = Frame::from_planes(RGB_S, planes, FrameProps::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions { .. }));
    }

    #[test]
    fn test_plane_out_of_range() {
        let frame = Frame::filled(GRAY_S, 2, 2, 0.0);
        assert!(matches!(frame.plane(1), Err(Error::PlaneOutOfRange { plane: 1, num_planes: 1 })));
        assert_eq!(frame.width(3), 0);
    }
}
