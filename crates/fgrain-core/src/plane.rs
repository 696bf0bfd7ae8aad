//! Plane buffers and borrowed plane views.
//!
//! A [`Plane`] owns the samples of one single-channel 2D grid. Rows are laid
//! out top-to-bottom, `stride` samples apart; the stride may exceed the width
//! to keep every row aligned:
//!
//! ```text
//! stride
//! |<------------------------------>|
//! [s s s s s s s s s s s s . . . .]  <- row 0 (width = 12, padding = 4)
//! [s s s s s s s s s s s s . . . .]  <- row 1
//! ```
//!
//! [`PlaneView`] and [`PlaneViewMut`] are the borrowed read-only and mutable
//! views handed to compute kernels. They can also wrap foreign buffers
//! (e.g. a tightly packed `Vec<f32>`), which is how kernels are tested in
//! isolation.
//!
//! # Example
//!
//! ```rust
//! use fgrain_core::plane::{Plane, PlaneView};
//!
//! let plane = Plane::filled(10, 4, 0.5f32);
//! assert!(plane.stride() >= 10);
//!
//! let view: PlaneView<'_, f32> = plane.view().unwrap();
//! assert_eq!(view.get(9, 3), 0.5);
//! assert_eq!(view.row(0).len(), 10);
//! ```

use half::f16;

use crate::format::SampleType;
use crate::{Error, Result};

/// Row alignment for freshly allocated planes, in bytes.
pub const STRIDE_ALIGN_BYTES: usize = 32;

/// Storage for one plane's samples.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaneSamples {
    /// 8-bit integer samples.
    U8(Vec<u8>),
    /// 16-bit integer samples.
    U16(Vec<u16>),
    /// 16-bit float samples.
    F16(Vec<f16>),
    /// 32-bit float samples.
    F32(Vec<f32>),
}

impl PlaneSamples {
    /// Number of stored samples (including row padding).
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::F16(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample type and bit depth of the stored samples.
    pub fn sample_kind(&self) -> (SampleType, u8) {
        match self {
            Self::U8(_) => (SampleType::Integer, 8),
            Self::U16(_) => (SampleType::Integer, 16),
            Self::F16(_) => (SampleType::Float, 16),
            Self::F32(_) => (SampleType::Float, 32),
        }
    }
}

/// A sample type that can be stored in a [`Plane`].
pub trait Sample: Copy + Send + Sync + 'static {
    /// Sample type of this Rust type.
    const SAMPLE_TYPE: SampleType;
    /// Bits per sample.
    const BITS: u8;
    /// Zero value used for padding and fresh allocations.
    const ZERO: Self;

    /// Borrows the samples if `samples` stores this type.
    fn slice(samples: &PlaneSamples) -> Option<&[Self]>;
    /// Mutably borrows the samples if `samples` stores this type.
    fn slice_mut(samples: &mut PlaneSamples) -> Option<&mut [Self]>;
    /// Wraps a buffer of this type.
    fn wrap(data: Vec<Self>) -> PlaneSamples;
}

macro_rules! impl_sample {
    ($ty:ty, $variant:ident, $sample_type:expr, $bits:expr, $zero:expr) => {
        impl Sample for $ty {
            const SAMPLE_TYPE: SampleType = $sample_type;
            const BITS: u8 = $bits;
            const ZERO: Self = $zero;

            #[inline]
            fn slice(samples: &PlaneSamples) -> Option<&[Self]> {
                match samples {
                    PlaneSamples::$variant(v) => Some(v),
                    _ => None,
                }
            }

            #[inline]
            fn slice_mut(samples: &mut PlaneSamples) -> Option<&mut [Self]> {
                match samples {
                    PlaneSamples::$variant(v) => Some(v),
                    _ => None,
                }
            }

            #[inline]
            fn wrap(data: Vec<Self>) -> PlaneSamples {
                PlaneSamples::$variant(data)
            }
        }
    };
}

impl_sample!(u8, U8, SampleType::Integer, 8, 0);
impl_sample!(u16, U16, SampleType::Integer, 16, 0);
impl_sample!(f16, F16, SampleType::Float, 16, f16::ZERO);
impl_sample!(f32, F32, SampleType::Float, 32, 0.0);

/// Stride (in samples) used for newly allocated planes of width `width`.
#[inline]
pub fn aligned_stride(width: u32, bytes_per_sample: usize) -> usize {
    let per_align = (STRIDE_ALIGN_BYTES / bytes_per_sample.max(1)).max(1);
    (width as usize).div_ceil(per_align) * per_align
}

/// Minimum buffer length for a `width` x `height` plane with `stride`.
///
/// The last row only needs `width` samples, so tightly packed buffers and
/// buffers whose final row padding was trimmed are both accepted.
#[inline]
fn required_len(width: u32, height: u32, stride: usize) -> usize {
    if height == 0 || width == 0 {
        0
    } else {
        stride * (height as usize - 1) + width as usize
    }
}

fn validate_layout(width: u32, height: u32, stride: usize, len: usize) -> Result<()> {
    if stride < width as usize {
        return Err(Error::InvalidStride {
            stride,
            min_stride: width as usize,
            width,
        });
    }
    let expected = required_len(width, height, stride);
    if len < expected {
        return Err(Error::BufferSizeMismatch {
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// Owned single-channel sample grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    width: u32,
    height: u32,
    stride: usize,
    samples: PlaneSamples,
}

impl Plane {
    /// Allocates a zeroed plane with an aligned stride.
    pub fn new<T: Sample>(width: u32, height: u32) -> Self {
        Self::filled(width, height, T::ZERO)
    }

    /// Allocates a plane with every sample (padding included) set to `value`.
    pub fn filled<T: Sample>(width: u32, height: u32, value: T) -> Self {
        let stride = aligned_stride(width, std::mem::size_of::<T>());
        let data = vec![value; stride * height as usize];
        Self {
            width,
            height,
            stride,
            samples: T::wrap(data),
        }
    }

    /// Wraps an existing buffer.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidStride`] if `stride < width`,
    /// [`Error::BufferSizeMismatch`] if the buffer is too short.
    pub fn from_vec<T: Sample>(width: u32, height: u32, stride: usize, data: Vec<T>) -> Result<Self> {
        validate_layout(width, height, stride, data.len())?;
        Ok(Self {
            width,
            height,
            stride,
            samples: T::wrap(data),
        })
    }

    /// Plane width in samples.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Plane height in rows.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Distance between row starts, in samples.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Raw sample storage.
    #[inline]
    pub fn samples(&self) -> &PlaneSamples {
        &self.samples
    }

    /// Typed read-only view.
    ///
    /// # Errors
    ///
    /// [`Error::SampleTypeMismatch`] if the plane stores another type.
    pub fn view<T: Sample>(&self) -> Result<PlaneView<'_, T>> {
        let data = T::slice(&self.samples).ok_or_else(|| {
            Error::sample_type_mismatch((T::SAMPLE_TYPE, T::BITS), self.samples.sample_kind())
        })?;
        Ok(PlaneView {
            data,
            width: self.width,
            height: self.height,
            stride: self.stride,
        })
    }

    /// Typed mutable view.
    ///
    /// # Errors
    ///
    /// [`Error::SampleTypeMismatch`] if the plane stores another type.
    pub fn view_mut<T: Sample>(&mut self) -> Result<PlaneViewMut<'_, T>> {
        let kind = self.samples.sample_kind();
        let data = T::slice_mut(&mut self.samples)
            .ok_or_else(|| Error::sample_type_mismatch((T::SAMPLE_TYPE, T::BITS), kind))?;
        Ok(PlaneViewMut {
            data,
            width: self.width,
            height: self.height,
            stride: self.stride,
        })
    }

    /// Copies the visible samples into a tightly packed `Vec` (no padding).
    pub fn to_packed<T: Sample>(&self) -> Result<Vec<T>> {
        let view = self.view::<T>()?;
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            out.extend_from_slice(view.row(y));
        }
        Ok(out)
    }
}

/// Read-only view into a plane.
#[derive(Debug, Clone, Copy)]
pub struct PlaneView<'a, T> {
    data: &'a [T],
    width: u32,
    height: u32,
    stride: usize,
}

impl<'a, T: Sample> PlaneView<'a, T> {
    /// Wraps a foreign buffer.
    pub fn new(data: &'a [T], width: u32, height: u32, stride: usize) -> Result<Self> {
        validate_layout(width, height, stride, data.len())?;
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Width in samples.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in rows.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Stride in samples.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Visible samples of row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row(&self, y: u32) -> &'a [T] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize]
    }

    /// Sample at (x, y).
    ///
    /// # Panics
    ///
    /// Panics if (x, y) is outside the plane.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> T {
        debug_assert!(x < self.width && y < self.height, "sample out of bounds");
        self.data[y as usize * self.stride + x as usize]
    }

    /// Sample at (x, y) with coordinates clamped to the plane edges.
    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64) -> T {
        let cx = x.clamp(0, self.width as i64 - 1) as u32;
        let cy = y.clamp(0, self.height as i64 - 1) as u32;
        self.get(cx, cy)
    }

    /// Whether the view has zero area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Mutable view into a plane.
#[derive(Debug)]
pub struct PlaneViewMut<'a, T> {
    data: &'a mut [T],
    width: u32,
    height: u32,
    stride: usize,
}

impl<'a, T: Sample> PlaneViewMut<'a, T> {
    /// Wraps a foreign mutable buffer.
    pub fn new(data: &'a mut [T], width: u32, height: u32, stride: usize) -> Result<Self> {
        validate_layout(width, height, stride, data.len())?;
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Width in samples.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in rows.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Stride in samples.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Visible samples of row `y`, mutably.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [T] {
        let start = y as usize * self.stride;
        &mut self.data[start..start + self.width as usize]
    }

    /// Underlying buffer including row padding.
    ///
    /// Row `y` starts at `y * stride`; use [`Self::rows_mut`] unless the
    /// caller splits rows itself (e.g. with rayon's `par_chunks_mut`).
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut *self.data
    }

    /// Iterator over the visible part of every row.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [T]> + '_ {
        let width = self.width as usize;
        let height = self.height as usize;
        self.data
            .chunks_mut(self.stride.max(1))
            .take(height)
            .map(move |row| &mut row[..width])
    }

    /// Reborrows as a read-only view.
    #[inline]
    pub fn as_view(&self) -> PlaneView<'_, T> {
        PlaneView {
            data: &*self.data,
            width: self.width,
            height: self.height,
            stride: self.stride,
        }
    }
}
