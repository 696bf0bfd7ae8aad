//! Grain parameters.
//!
//! [`GrainConfig`] is the loose, user-facing form: every field optional,
//! readable from YAML with the same camelCase names the filter takes as
//! arguments. [`GrainConfig::resolve`] fills in defaults, validates and
//! produces the immutable [`GrainParams`] a filter instance keeps for its
//! whole lifetime.
//!
//! ```yaml
//! numIterations: 400
//! grainRadiusMean: 0.12
//! grainRadiusStd: 0.02
//! sigma: 0.8
//! seed: 42
//! seedMode: perFrame
//! rangePolicy: clamp
//! ```

use std::path::Path;
use std::str::FromStr;

use fgrain_compute::{KernelParams, RangePolicy, mix_seed};
use serde::Deserialize;

use crate::{FilterError, FilterResult};

/// Default Monte Carlo trials per pixel.
pub const DEFAULT_NUM_ITERATIONS: u32 = 800;
/// Default mean grain radius, in pixels.
pub const DEFAULT_GRAIN_RADIUS_MEAN: f32 = 0.1;
/// Default grain radius standard deviation.
pub const DEFAULT_GRAIN_RADIUS_STD: f32 = 0.0;
/// Default Gaussian filter sigma, in pixels.
pub const DEFAULT_SIGMA: f32 = 0.8;
/// Default seed.
pub const DEFAULT_SEED: i32 = 114514;

/// How the seed varies across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedMode {
    /// Same seed for every frame; identical frames get identical grain.
    #[default]
    Static,
    /// Frame index mixed into the seed; grain changes every frame.
    PerFrame,
}

impl FromStr for SeedMode {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "static" => Ok(Self::Static),
            "perframe" => Ok(Self::PerFrame),
            _ => Err(FilterError::invalid_parameter(
                "seedMode",
                format!("unknown mode '{s}' (expected static or perFrame)"),
            )),
        }
    }
}

/// Unresolved grain configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GrainConfig {
    /// Monte Carlo trials per pixel.
    pub num_iterations: Option<i64>,
    /// Mean grain radius.
    pub grain_radius_mean: Option<f64>,
    /// Grain radius standard deviation.
    pub grain_radius_std: Option<f64>,
    /// Gaussian filter sigma.
    pub sigma: Option<f64>,
    /// Random seed.
    pub seed: Option<i64>,
    /// `static` or `perFrame`.
    pub seed_mode: Option<String>,
    /// `preserve` or `clamp`.
    pub range_policy: Option<String>,
}

impl GrainConfig {
    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> FilterResult<Self> {
        // An empty document is an empty config, not an error
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> FilterResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FilterError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Returns `self` with every field set in `other` overridden.
    pub fn overlay(&self, other: &GrainConfig) -> GrainConfig {
        GrainConfig {
            num_iterations: other.num_iterations.or(self.num_iterations),
            grain_radius_mean: other.grain_radius_mean.or(self.grain_radius_mean),
            grain_radius_std: other.grain_radius_std.or(self.grain_radius_std),
            sigma: other.sigma.or(self.sigma),
            seed: other.seed.or(self.seed),
            seed_mode: other.seed_mode.clone().or_else(|| self.seed_mode.clone()),
            range_policy: other.range_policy.clone().or_else(|| self.range_policy.clone()),
        }
    }

    /// Applies defaults and validates.
    ///
    /// Integers saturate to the 32-bit range before validation.
    ///
    /// # Errors
    ///
    /// [`FilterError::InvalidParameter`] naming the first bad field.
    pub fn resolve(&self) -> FilterResult<GrainParams> {
        let num_iterations = match self.num_iterations {
            None => DEFAULT_NUM_ITERATIONS,
            Some(n) => {
                let n = saturate_i32(n);
                if n < 1 {
                    return Err(FilterError::invalid_parameter(
                        "numIterations",
                        format!("must be at least 1, got {n}"),
                    ));
                }
                n as u32
            }
        };

        let grain_radius_mean = resolve_float("grainRadiusMean", self.grain_radius_mean, DEFAULT_GRAIN_RADIUS_MEAN)?;
        if grain_radius_mean <= 0.0 {
            return Err(FilterError::invalid_parameter(
                "grainRadiusMean",
                format!("must be positive, got {grain_radius_mean}"),
            ));
        }
        let grain_radius_std = resolve_float("grainRadiusStd", self.grain_radius_std, DEFAULT_GRAIN_RADIUS_STD)?;
        if grain_radius_std < 0.0 {
            return Err(FilterError::invalid_parameter(
                "grainRadiusStd",
                format!("must be non-negative, got {grain_radius_std}"),
            ));
        }
        let sigma = resolve_float("sigma", self.sigma, DEFAULT_SIGMA)?;
        if sigma < 0.0 {
            return Err(FilterError::invalid_parameter(
                "sigma",
                format!("must be non-negative, got {sigma}"),
            ));
        }

        let seed = self.seed.map(saturate_i32).unwrap_or(DEFAULT_SEED);

        let seed_mode = match &self.seed_mode {
            Some(s) => s.parse()?,
            None => SeedMode::default(),
        };
        let range_policy = match &self.range_policy {
            Some(s) => s
                .parse::<RangePolicy>()
                .map_err(|e| FilterError::invalid_parameter("rangePolicy", e.to_string()))?,
            None => RangePolicy::default(),
        };

        let params = GrainParams {
            num_iterations,
            grain_radius_mean,
            grain_radius_std,
            sigma,
            seed,
            seed_mode,
            range_policy,
        };
        // radius combinations the kernel cannot build are config errors
        params.kernel_params(0, 0).validate().map_err(|e| {
            let name = if grain_radius_std > 0.0 { "grainRadiusStd" } else { "grainRadiusMean" };
            FilterError::invalid_parameter(name, e.to_string())
        })?;
        Ok(params)
    }
}

fn saturate_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn resolve_float(name: &'static str, value: Option<f64>, default: f32) -> FilterResult<f32> {
    let v = value.map(|v| v as f32).unwrap_or(default);
    if !v.is_finite() {
        return Err(FilterError::invalid_parameter(name, format!("must be finite, got {v}")));
    }
    Ok(v)
}

/// Resolved, validated grain parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GrainParams {
    num_iterations: u32,
    grain_radius_mean: f32,
    grain_radius_std: f32,
    sigma: f32,
    seed: i32,
    seed_mode: SeedMode,
    range_policy: RangePolicy,
}

impl Default for GrainParams {
    fn default() -> Self {
        Self {
            num_iterations: DEFAULT_NUM_ITERATIONS,
            grain_radius_mean: DEFAULT_GRAIN_RADIUS_MEAN,
            grain_radius_std: DEFAULT_GRAIN_RADIUS_STD,
            sigma: DEFAULT_SIGMA,
            seed: DEFAULT_SEED,
            seed_mode: SeedMode::Static,
            range_policy: RangePolicy::Preserve,
        }
    }
}

impl GrainParams {
    /// Monte Carlo trials per pixel.
    #[inline]
    pub fn num_iterations(&self) -> u32 {
        self.num_iterations
    }

    /// Mean grain radius.
    #[inline]
    pub fn grain_radius_mean(&self) -> f32 {
        self.grain_radius_mean
    }

    /// Grain radius standard deviation.
    #[inline]
    pub fn grain_radius_std(&self) -> f32 {
        self.grain_radius_std
    }

    /// Gaussian filter sigma.
    #[inline]
    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    /// User seed, before frame/plane mixing.
    #[inline]
    pub fn seed(&self) -> i32 {
        self.seed
    }

    /// Seed variation across frames.
    #[inline]
    pub fn seed_mode(&self) -> SeedMode {
        self.seed_mode
    }

    /// Out-of-range handling.
    #[inline]
    pub fn range_policy(&self) -> RangePolicy {
        self.range_policy
    }

    /// Kernel inputs for `plane` of frame `frame`.
    pub fn kernel_params(&self, frame: u64, plane: u32) -> KernelParams {
        let frame = match self.seed_mode {
            SeedMode::Static => None,
            SeedMode::PerFrame => Some(frame),
        };
        KernelParams {
            num_iterations: self.num_iterations,
            grain_radius_mean: self.grain_radius_mean,
            grain_radius_std: self.grain_radius_std,
            sigma: self.sigma,
            seed: mix_seed(self.seed, frame, plane),
            range_policy: self.range_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let p = GrainConfig::default().resolve().unwrap();
        assert_eq!(p, GrainParams::default());
        assert_eq!(p.num_iterations(), 800);
        assert_relative_eq!(p.grain_radius_mean(), 0.1);
        assert_relative_eq!(p.grain_radius_std(), 0.0);
        assert_relative_eq!(p.sigma(), 0.8);
        assert_eq!(p.seed(), 114514);
        assert_eq!(p.seed_mode(), SeedMode::Static);
        assert_eq!(p.range_policy(), RangePolicy::Preserve);
    }

    #[test]
    fn test_yaml() {
        let cfg = GrainConfig::from_yaml_str(
            "numIterations: 64\ngrainRadiusMean: 0.2\nseed: -3\nseedMode: perFrame\nrangePolicy: clamp\n",
        )
        .unwrap();
        let p = cfg.resolve().unwrap();
        assert_eq!(p.num_iterations(), 64);
        assert_relative_eq!(p.grain_radius_mean(), 0.2);
        assert_eq!(p.sigma(), DEFAULT_SIGMA);
        assert_eq!(p.seed(), -3);
        assert_eq!(p.seed_mode(), SeedMode::PerFrame);
        assert_eq!(p.range_policy(), RangePolicy::Clamp);
    }

    #[test]
    fn test_yaml_rejects_unknown_keys() {
        assert!(matches!(
            GrainConfig::from_yaml_str("grainSize: 3\n"),
            Err(FilterError::Yaml(_))
        ));
        assert_eq!(GrainConfig::from_yaml_str("  \n").unwrap(), GrainConfig::default());
    }

    #[test]
    fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grain.yaml");
        std::fs::write(&path, "sigma: 1.5\n").unwrap();
        let cfg = GrainConfig::load(&path).unwrap();
        assert_eq!(cfg.sigma, Some(1.5));

        let missing = GrainConfig::load(dir.path().join("nope.yaml"));
        assert!(matches!(missing, Err(FilterError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_overlay() {
        let base = GrainConfig {
            sigma: Some(0.5),
            seed: Some(1),
            ..Default::default()
        };
        let cli = GrainConfig {
            seed: Some(2),
            ..Default::default()
        };
        let merged = base.overlay(&cli);
        assert_eq!(merged.sigma, Some(0.5));
        assert_eq!(merged.seed, Some(2));
    }

    #[test]
    fn test_validation() {
        let bad = [
            GrainConfig { num_iterations: Some(0), ..Default::default() },
            GrainConfig { num_iterations: Some(-5), ..Default::default() },
            GrainConfig { grain_radius_mean: Some(0.0), ..Default::default() },
            GrainConfig { grain_radius_mean: Some(f64::NAN), ..Default::default() },
            GrainConfig { grain_radius_std: Some(-0.1), ..Default::default() },
            GrainConfig { sigma: Some(-1.0), ..Default::default() },
            GrainConfig { sigma: Some(1e300), ..Default::default() },
            GrainConfig { grain_radius_std: Some(1e19), ..Default::default() },
            GrainConfig { grain_radius_mean: Some(1e6), ..Default::default() },
            GrainConfig { seed_mode: Some("random".into()), ..Default::default() },
            GrainConfig { range_policy: Some("wrap".into()), ..Default::default() },
        ];
        for cfg in bad {
            assert!(
                matches!(cfg.resolve(), Err(FilterError::InvalidParameter { .. })),
                "{cfg:?}"
            );
        }
    }

    #[test]
    fn test_saturation() {
        let p = GrainConfig {
            num_iterations: Some(i64::MAX),
            seed: Some(i64::MIN),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(p.num_iterations(), i32::MAX as u32);
        assert_eq!(p.seed(), i32::MIN);
    }

    #[test]
    fn test_kernel_params_seed_mode() {
        let p = GrainParams::default();
        assert_eq!(p.kernel_params(0, 0).seed, p.kernel_params(9, 0).seed);
        assert_ne!(p.kernel_params(0, 0).seed, p.kernel_params(0, 1).seed);

        let per_frame = GrainConfig {
            seed_mode: Some("per-frame".into()),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        assert_ne!(per_frame.kernel_params(0, 0).seed, per_frame.kernel_params(1, 0).seed);
        assert_eq!(per_frame.kernel_params(3, 2), per_frame.kernel_params(3, 2));
    }
}
