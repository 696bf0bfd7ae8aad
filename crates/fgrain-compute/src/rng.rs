//! Deterministic, stateless-seeded randomness for grain synthesis.
//!
//! Nothing here touches global or thread-local state. Every random stream
//! is created from a hash of integer coordinates and the plane seed, so the
//! value of any output sample is independent of evaluation order and of the
//! number of worker threads.

/// Stream id for the per-iteration Gaussian offsets.
pub(crate) const OFFSET_STREAM: i32 = 0x0ff5_e7;

/// Stream id for plane seed derivation.
const PLANE_STREAM: i32 = 0x91a_4e;

/// Final avalanche of a 32-bit hash (murmur3 fmix32).
#[inline]
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Integer hash of a 2D coordinate and a seed.
///
/// Neighbouring coordinates produce uncorrelated outputs; used to seed the
/// per-cell grain generators.
#[inline]
pub fn hash(x: i32, y: i32, seed: u32) -> u32 {
    let mut h = seed;
    h ^= x as u32;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 15;
    h ^= y as u32;
    h = h.wrapping_mul(0xc2b2_ae35);
    fmix32(h)
}

/// Derives the kernel seed for one plane of one frame.
///
/// `frame` is `None` when the user seed is used as-is for every frame;
/// with `Some(n)` frame `n` gets its own grain pattern. The plane index is
/// always mixed in so the channels of a colour frame carry independent
/// grain.
pub fn mix_seed(seed: i32, frame: Option<u64>, plane: u32) -> u32 {
    let mut base = seed as u32;
    if let Some(n) = frame {
        base = hash(n as u32 as i32, (n >> 32) as u32 as i32, base);
    }
    hash(plane as i32, PLANE_STREAM, base)
}

/// Small xorshift32 generator.
///
/// Cheap to construct, which matters because a new generator is created for
/// every cell visited by every Monte Carlo trial.
#[derive(Debug, Clone)]
pub struct GrainRng {
    state: u32,
}

impl GrainRng {
    /// Seeds a generator. Any seed is valid, including zero.
    #[inline]
    pub fn new(seed: u32) -> Self {
        let state = fmix32(seed);
        // xorshift has a fixed point at zero; fmix32 maps only 0 to 0
        Self {
            state: if state == 0 { 0x9e37_79b9 } else { state },
        }
    }

    /// Generator for grid cell (`cell_x`, `cell_y`).
    #[inline]
    pub fn for_cell(cell_x: i32, cell_y: i32, seed: u32) -> Self {
        Self::new(hash(cell_x, cell_y, seed))
    }

    /// Next raw 32-bit output.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform sample in (0, 1].
    #[inline]
    pub fn uniform(&mut self) -> f32 {
        ((self.next_u32() >> 8) as f32 + 1.0) / 16_777_216.0
    }

    /// Uniform sample in [0, 1).
    #[inline]
    pub fn uniform_unit(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / 16_777_216.0
    }

    /// Standard normal sample (Box-Muller, one branch).
    #[inline]
    pub fn normal(&mut self) -> f32 {
        let u1 = self.uniform();
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
    }

    /// Poisson sample with mean `lambda` by inversion of the CDF.
    ///
    /// `exp_neg_lambda` is `exp(-lambda)`, passed in because callers usually
    /// have it already. The count is capped at `10000 * lambda`.
    pub fn poisson(&mut self, lambda: f32, exp_neg_lambda: f32) -> u32 {
        if !(lambda > 0.0) {
            return 0;
        }
        let u = self.uniform();
        invert_poisson(f64::from(u), f64::from(lambda), f64::from(exp_neg_lambda))
    }
}

/// Smallest `k` whose Poisson CDF reaches `u`.
///
/// Stops early once the CDF no longer grows, so `u` at or above the
/// accumulated total does not walk to the cap.
fn invert_poisson(u: f64, lambda: f64, exp_neg_lambda: f64) -> u32 {
    let limit = (10_000.0 * lambda).floor().min(f64::from(u32::MAX)) as u32;
    let mut k = 0u32;
    let mut prob = exp_neg_lambda;
    let mut cdf = prob;
    while u > cdf && k < limit {
        k += 1;
        prob *= lambda / f64::from(k);
        let next = cdf + prob;
        if next == cdf {
            break;
        }
        cdf = next;
    }
    k
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash(3, 7, 42), hash(3, 7, 42));
        assert_ne!(hash(3, 7, 42), hash(7, 3, 42));
        assert_ne!(hash(3, 7, 42), hash(3, 7, 43));
    }

    #[test]
    fn test_mix_seed() {
        let a = mix_seed(114514, None, 0);
        assert_eq!(a, mix_seed(114514, None, 0));
        assert_ne!(a, mix_seed(114514, None, 1));
        assert_ne!(a, mix_seed(114514, Some(0), 0));
        assert_ne!(mix_seed(114514, Some(1), 0), mix_seed(114514, Some(2), 0));
        assert_ne!(mix_seed(-1, None, 0), mix_seed(1, None, 0));
    }

    #[test]
    fn test_zero_seed() {
        let mut rng = GrainRng::new(0);
        assert_ne!(rng.next_u32(), 0);
    }

    #[test]
    fn test_uniform_range() {
        let mut rng = GrainRng::new(1234);
        for _ in 0..10_000 {
            let u = rng.uniform();
            assert!(u > 0.0 && u <= 1.0);
            let v = rng.uniform_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_normal_moments() {
        let mut rng = GrainRng::new(99);
        let n = 50_000;
        let samples: Vec<f32> = (0..n).map(|_| rng.normal()).collect();
        let mean = samples.iter().sum::<f32>() / n as f32;
        let var = samples.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n as f32;
        assert!(mean.abs() < 0.03, "mean {mean}");
        assert!((var - 1.0).abs() < 0.05, "var {var}");
        assert!(samples.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_poisson_mean() {
        let mut rng = GrainRng::new(7);
        let lambda = 2.5f32;
        let e = (-lambda).exp();
        let n = 20_000;
        let total: u64 = (0..n).map(|_| rng.poisson(lambda, e) as u64).sum();
        let mean = total as f32 / n as f32;
        assert!((mean - lambda).abs() < 0.1, "mean {mean}");
    }

    #[test]
    fn test_poisson_zero_lambda() {
        let mut rng = GrainRng::new(7);
        assert_eq!(rng.poisson(0.0, 1.0), 0);
        assert_eq!(rng.poisson(f32::NAN, 1.0), 0);
    }

    #[test]
    fn test_poisson_tail_terminates() {
        // u = 1 sits at or past the accumulated CDF
        let lambda = 0.2f64;
        let k = invert_poisson(1.0, lambda, (-lambda).exp());
        assert!(k < 50, "k {k}");
        assert!(k > 0);

        let lambda = 30.0f64;
        let k = invert_poisson(1.0, lambda, (-lambda).exp());
        assert!(k < 200, "k {k}");
    }

    #[test]
    fn test_poisson_inversion_small_u() {
        let lambda = 1.5f64;
        let e = (-lambda).exp();
        assert_eq!(invert_poisson(e * 0.5, lambda, e), 0);
        assert_eq!(invert_poisson(e * 1.5, lambda, e), 1);
    }

    #[test]
    fn test_cell_streams_reproducible() {
        let mut a = GrainRng::for_cell(-4, 9, 1);
        let mut b = GrainRng::for_cell(-4, 9, 1);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }
}
