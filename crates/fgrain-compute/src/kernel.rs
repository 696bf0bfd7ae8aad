//! Boolean-model grain kernel.
//!
//! Grain is modelled as discs dropped on the plane by a Poisson process
//! whose density follows the local intensity: brighter regions get more
//! grains. An output sample is the fraction of Gaussian-jittered probe
//! points around the pixel centre that fall inside at least one disc.
//!
//! The plane is partitioned into square cells of side `delta`. The grains of
//! a cell are generated on demand from a generator seeded by the cell
//! coordinates, so a cell always holds the same grains no matter which
//! pixel, trial or thread visits it.
//!
//! # Example
//!
//! ```
//! use fgrain_compute::{GrainModel, KernelParams};
//! use fgrain_core::PlaneView;
//!
//! let data = vec![0.5f32; 8 * 8];
//! let src = PlaneView::new(&data, 8, 8, 8)?;
//! let model = GrainModel::new(&KernelParams { num_iterations: 64, ..Default::default() })?;
//!
//! let v = model.render_pixel(&src, 3, 3);
//! assert!((0.0..=1.0).contains(&v));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::str::FromStr;

use fgrain_core::PlaneView;
#[allow(unused_imports)]
use tracing::{debug, trace};

use crate::rng::{GrainRng, OFFSET_STREAM, hash};
use crate::{ComputeError, ComputeResult};

/// Upper bound applied to intensities before the density transform.
///
/// Keeps `ln(1 - u)` finite for white pixels; matches an 8-bit table built
/// as `(255 - i) / 255.1`.
pub const MAX_INTENSITY: f32 = 255.0 / 255.1;

/// Normal quantile used for the largest log-normal radius (p = 0.999).
const RADIUS_QUANTILE: f64 = 3.0902;

/// Most grid cells a single coverage test may visit.
///
/// The window is `(ceil(2 * max_radius / cell_size) + 1)^2` cells, so this
/// admits grains up to roughly 60 pixels in radius.
pub const MAX_CELLS_PER_TRIAL: u64 = 16_384;

/// What to do with intensities outside [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangePolicy {
    /// Add the out-of-range part back after grain synthesis.
    #[default]
    Preserve,
    /// Output grain coverage only, always in [0, 1].
    Clamp,
}

impl FromStr for RangePolicy {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "clamp" => Ok(Self::Clamp),
            other => Err(ComputeError::InvalidParameter(format!(
                "unknown range policy '{other}' (expected preserve or clamp)"
            ))),
        }
    }
}

/// Per-plane kernel inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelParams {
    /// Monte Carlo trials per pixel.
    pub num_iterations: u32,
    /// Mean grain radius in pixels.
    pub grain_radius_mean: f32,
    /// Standard deviation of the grain radius; 0 means fixed-size grains.
    pub grain_radius_std: f32,
    /// Standard deviation of the Gaussian filter applied to probe points.
    pub sigma: f32,
    /// Seed for this plane (already mixed with frame/plane if required).
    pub seed: u32,
    /// Out-of-range handling.
    pub range_policy: RangePolicy,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            num_iterations: 800,
            grain_radius_mean: 0.1,
            grain_radius_std: 0.0,
            sigma: 0.8,
            seed: 114514,
            range_policy: RangePolicy::Preserve,
        }
    }
}

impl KernelParams {
    /// Checks that the parameters describe a valid grain model.
    pub fn validate(&self) -> ComputeResult<()> {
        self.shape().map(|_| ())
    }

    fn shape(&self) -> ComputeResult<Shape> {
        if self.num_iterations == 0 {
            return Err(ComputeError::InvalidParameter(
                "num_iterations must be at least 1".into(),
            ));
        }
        if !self.grain_radius_mean.is_finite() || self.grain_radius_mean <= 0.0 {
            return Err(ComputeError::InvalidParameter(format!(
                "grain_radius_mean must be finite and positive, got {}",
                self.grain_radius_mean
            )));
        }
        if !self.grain_radius_std.is_finite() || self.grain_radius_std < 0.0 {
            return Err(ComputeError::InvalidParameter(format!(
                "grain_radius_std must be finite and non-negative, got {}",
                self.grain_radius_std
            )));
        }
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(ComputeError::InvalidParameter(format!(
                "sigma must be finite and non-negative, got {}",
                self.sigma
            )));
        }
        Shape::derive(self)
    }
}

/// Radius-dependent model constants.
#[derive(Debug, Clone, Copy)]
struct Shape {
    delta: f32,
    density: f32,
    ln_mu: f32,
    ln_sigma: f32,
    max_radius: f32,
}

impl Shape {
    /// Computed in f64; rejects radius settings the f32 kernel cannot
    /// represent or that make a coverage test visit too many cells.
    fn derive(params: &KernelParams) -> ComputeResult<Self> {
        let mean = f64::from(params.grain_radius_mean);
        let std = f64::from(params.grain_radius_std);

        let delta = 1.0 / (1.0 / mean).ceil();
        let density = delta * delta / (std::f64::consts::PI * (mean * mean + std * std));

        let (ln_mu, ln_sigma, max_radius) = if std > 0.0 {
            let ratio = std / mean;
            let ln_sigma = (1.0 + ratio * ratio).ln().sqrt();
            let ln_mu = mean.ln() - ln_sigma * ln_sigma / 2.0;
            (ln_mu, ln_sigma, (ln_mu + RADIUS_QUANTILE * ln_sigma).exp())
        } else {
            (0.0, 0.0, mean)
        };

        let shape = Self {
            delta: delta as f32,
            density: density as f32,
            ln_mu: ln_mu as f32,
            ln_sigma: ln_sigma as f32,
            max_radius: max_radius as f32,
        };
        if !shape.delta.is_normal() || !shape.density.is_normal() {
            return Err(ComputeError::InvalidParameter(format!(
                "grain radius mean {mean} / std {std} gives a degenerate grain density"
            )));
        }
        if !shape.ln_mu.is_finite() || !shape.ln_sigma.is_finite() || !shape.max_radius.is_normal() {
            return Err(ComputeError::InvalidParameter(format!(
                "grain radius mean {mean} / std {std} gives no finite radius distribution"
            )));
        }

        let side = (2.0 * max_radius / delta).ceil() + 1.0;
        if side * side > MAX_CELLS_PER_TRIAL as f64 {
            return Err(ComputeError::InvalidParameter(format!(
                "grain radius mean {mean} / std {std} needs {side:.0}x{side:.0} cells per trial \
                 (limit {MAX_CELLS_PER_TRIAL})"
            )));
        }
        Ok(shape)
    }
}

/// Splits a raw sample into the intensity used for grain density and the
/// residual outside [0, 1]. Non-finite samples have no residual.
#[inline]
fn split_intensity(v: f32) -> (f32, f32) {
    if v.is_nan() {
        return (0.0, 0.0);
    }
    let u = v.clamp(0.0, 1.0);
    let residual = if v.is_finite() { v - u } else { 0.0 };
    (u, residual)
}

/// Precomputed grain model for one plane.
#[derive(Debug, Clone)]
pub struct GrainModel {
    radius_mean: f32,
    radius_std: f32,
    /// Cell side length.
    delta: f32,
    inv_delta: f32,
    /// `delta^2 / (pi * E[r^2])`.
    density: f32,
    ln_mu: f32,
    ln_sigma: f32,
    max_radius: f32,
    seed: u32,
    range_policy: RangePolicy,
    /// Probe offsets, one per trial.
    offsets: Vec<(f32, f32)>,
}

impl GrainModel {
    /// Builds the model, drawing the probe offsets from the seed.
    pub fn new(params: &KernelParams) -> ComputeResult<Self> {
        let Shape {
            delta,
            density,
            ln_mu,
            ln_sigma,
            max_radius,
        } = params.shape()?;
        trace!(delta, density, max_radius, iterations = params.num_iterations, "grain model");

        let offsets = (0..params.num_iterations)
            .map(|k| {
                let mut rng = GrainRng::new(hash(k as i32, OFFSET_STREAM, params.seed));
                let dx = params.sigma * rng.normal();
                let dy = params.sigma * rng.normal();
                (dx, dy)
            })
            .collect();

        Ok(Self {
            radius_mean: params.grain_radius_mean,
            radius_std: params.grain_radius_std,
            delta,
            inv_delta: 1.0 / delta,
            density,
            ln_mu,
            ln_sigma,
            max_radius,
            seed: params.seed,
            range_policy: params.range_policy,
            offsets,
        })
    }

    /// Cell side length.
    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.delta
    }

    /// Largest grain radius the model can produce.
    #[inline]
    pub fn max_radius(&self) -> f32 {
        self.max_radius
    }

    /// Number of Monte Carlo trials per pixel.
    #[inline]
    pub fn num_iterations(&self) -> usize {
        self.offsets.len()
    }

    /// Expected grain count of a cell with intensity `u`.
    #[inline]
    pub fn lambda(&self, u: f32) -> f32 {
        let u = if u.is_nan() { 0.0 } else { u.clamp(0.0, MAX_INTENSITY) };
        -self.density * (1.0 - u).ln()
    }

    /// Draws one grain radius.
    #[inline]
    pub fn sample_radius(&self, rng: &mut GrainRng) -> f32 {
        if self.radius_std > 0.0 {
            (self.ln_mu + self.ln_sigma * rng.normal())
                .exp()
                .min(self.max_radius)
        } else {
            self.radius_mean
        }
    }

    /// Whether point (`x`, `y`) lies inside any grain.
    pub fn covered(&self, src: &PlaneView<'_, f32>, x: f32, y: f32) -> bool {
        let r = self.max_radius;
        let min_cx = ((x - r) * self.inv_delta).floor() as i64;
        let max_cx = ((x + r) * self.inv_delta).floor() as i64;
        let min_cy = ((y - r) * self.inv_delta).floor() as i64;
        let max_cy = ((y + r) * self.inv_delta).floor() as i64;

        for cy in min_cy..=max_cy {
            for cx in min_cx..=max_cx {
                let corner_x = self.delta * cx as f32;
                let corner_y = self.delta * cy as f32;
                let mut rng = GrainRng::for_cell(cx as i32, cy as i32, self.seed);

                let raw = src.get_clamped(corner_x.floor() as i64, corner_y.floor() as i64);
                let (u, _) = split_intensity(raw);
                let lambda = self.lambda(u);
                let count = rng.poisson(lambda, (-lambda).exp());

                for _ in 0..count {
                    let gx = corner_x + rng.uniform_unit() * self.delta;
                    let gy = corner_y + rng.uniform_unit() * self.delta;
                    let radius = self.sample_radius(&mut rng);
                    let dx = gx - x;
                    let dy = gy - y;
                    if dx * dx + dy * dy < radius * radius {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Monte Carlo coverage estimate around point (`x`, `y`), in [0, 1].
    pub fn coverage(&self, src: &PlaneView<'_, f32>, x: f32, y: f32) -> f32 {
        let hits: u64 = self
            .offsets
            .iter()
            .filter(|&&(dx, dy)| self.covered(src, x + dx, y + dy))
            .count() as u64;
        (hits as f64 / self.offsets.len() as f64) as f32
    }

    /// Output sample for pixel (`x`, `y`) of `src`.
    pub fn render_pixel(&self, src: &PlaneView<'_, f32>, x: u32, y: u32) -> f32 {
        let (_, residual) = split_intensity(src.get(x, y));
        let value = self.coverage(src, x as f32 + 0.5, y as f32 + 0.5);
        match self.range_policy {
            RangePolicy::Preserve => value + residual,
            RangePolicy::Clamp => value,
        }
    }

    /// Renders one output row.
    pub fn render_row(&self, src: &PlaneView<'_, f32>, y: u32, out: &mut [f32]) {
        for (x, v) in out.iter_mut().enumerate().take(src.width() as usize) {
            *v = self.render_pixel(src, x as u32, y);
        }
    }
}
