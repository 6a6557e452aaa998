//! Discrete Gaussian sampling over Z.
//!
//! Rejection sampling against the density exp(-x^2 / (2 sigma^2)), truncated
//! at the caller's bound. The proposal window is the 6-sigma tailcut (or the
//! bound, whichever is tighter); the mass outside 6 sigma is below 2^-25.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Draw one sample from the discrete Gaussian D_sigma truncated at `bound`.
///
/// Returns a signed integer in centered representation.
pub fn sample_z<R: Rng + ?Sized>(rng: &mut R, sigma: f64, bound: f64) -> i64 {
    let six_sigma = (6.0 * sigma).ceil();
    let tailcut = six_sigma.min(bound).max(0.0) as i64;
    if tailcut == 0 {
        return 0;
    }

    let sigma_sq_2 = 2.0 * sigma * sigma;
    loop {
        let x = rng.gen_range(-tailcut..=tailcut);
        let x_f = x as f64;
        let prob = (-(x_f * x_f) / sigma_sq_2).exp();
        let u: f64 = rng.gen();
        if u < prob {
            return x;
        }
    }
}

/// Draw one sample and map it into `[0, q)`: negative values wrap to `q - |x|`.
pub fn sample_z_centered<R: Rng + ?Sized>(rng: &mut R, sigma: f64, bound: f64, q: u64) -> u64 {
    let s = sample_z(rng, sigma, bound);
    if s >= 0 {
        s as u64 % q
    } else {
        q - ((-s) as u64 % q)
    }
}

/// Discrete Gaussian sampler with its own ChaCha20 stream.
///
/// Keyed construction gives a deterministic stream: the same seed bytes
/// yield the same samples.
#[derive(Clone)]
pub struct GaussianSampler {
    sigma: f64,
    bound: f64,
    rng: ChaCha20Rng,
}

impl GaussianSampler {
    /// Create a sampler seeded from the host entropy source.
    pub fn new(sigma: f64, bound: f64) -> Self {
        Self {
            sigma,
            bound,
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    /// Create a deterministic sampler keyed by `seed`.
    ///
    /// Seeds shorter than 32 bytes are zero-padded into the ChaCha20 key;
    /// longer seeds are truncated.
    pub fn from_seed(sigma: f64, bound: f64, seed: &[u8]) -> Self {
        let mut key = [0u8; 32];
        let n = seed.len().min(32);
        key[..n].copy_from_slice(&seed[..n]);
        Self {
            sigma,
            bound,
            rng: ChaCha20Rng::from_seed(key),
        }
    }

    /// The standard deviation.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Draw one signed sample.
    pub fn sample(&mut self) -> i64 {
        sample_z(&mut self.rng, self.sigma, self.bound)
    }

    /// Draw `len` samples mapped into `[0, q)`.
    pub fn sample_vec_centered(&mut self, len: usize, q: u64) -> Vec<u64> {
        (0..len)
            .map(|_| sample_z_centered(&mut self.rng, self.sigma, self.bound, q))
            .collect()
    }
}

impl std::fmt::Debug for GaussianSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaussianSampler")
            .field("sigma", &self.sigma)
            .field("bound", &self.bound)
            .finish()
    }
}
