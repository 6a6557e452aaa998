//! Polynomial ring layer over Z_q.
//!
//! A [`Ring`] of dimension m over a prime q with q ≡ 1 (mod 2m) admits a
//! primitive 2m-th root of unity; the constructor finds one, which makes ring
//! construction itself the NTT-friendliness check used by parameter
//! validation. Sampling draws whole polynomials at a time, and the product
//! path exposed here is the coefficient-wise multiply whose coefficient sum
//! is an exact inner product of the two coefficient vectors.

use rand::Rng;

use super::gaussian::{sample_z_centered, GaussianSampler};
use super::vector::{add_mod, mul_mod, Vector};
use crate::error::{Error, Result};

/// Modular exponentiation `base^exp mod m`.
pub(crate) fn mod_pow(mut base: u64, mut exp: u64, m: u64) -> u64 {
    let mut result = 1u64;
    base %= m;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, m);
        }
        exp >>= 1;
        base = mul_mod(base, base, m);
    }
    result
}

/// Polynomial with coefficients in Z_q.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poly {
    coeffs: Vec<u64>,
    q: u64,
}

impl Poly {
    /// Create a polynomial from coefficients, reducing each mod q.
    pub fn from_coeffs(coeffs: Vec<u64>, q: u64) -> Self {
        let coeffs = coeffs.into_iter().map(|c| c % q).collect();
        Self { coeffs, q }
    }

    /// Number of coefficients.
    pub fn dimension(&self) -> usize {
        self.coeffs.len()
    }

    /// The coefficient slice.
    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    /// Coefficient-wise product mod q.
    pub fn mul_coeffs(&self, other: &Self) -> Self {
        assert_eq!(self.q, other.q, "moduli must match");
        assert_eq!(
            self.coeffs.len(),
            other.coeffs.len(),
            "dimensions must match"
        );
        let coeffs = self
            .coeffs
            .iter()
            .zip(other.coeffs.iter())
            .map(|(&a, &b)| mul_mod(a, b, self.q))
            .collect();
        Self { coeffs, q: self.q }
    }

    /// Sum of all coefficients mod q.
    pub fn coeff_sum(&self) -> u64 {
        self.coeffs
            .iter()
            .fold(0u64, |acc, &c| add_mod(acc, c, self.q))
    }
}

/// Ring of dimension m over a prime modulus q with q ≡ 1 (mod 2m).
#[derive(Debug, Clone)]
pub struct Ring {
    dim: usize,
    q: u64,
    psi: u64,
}

impl Ring {
    /// Construct the ring, verifying that it is NTT-friendly.
    ///
    /// Requires `dim` to be a power of two of at least 16 and
    /// `q ≡ 1 (mod 2·dim)`, then locates a primitive 2m-th root of unity.
    pub fn new(dim: usize, q: u64) -> Result<Self> {
        if !dim.is_power_of_two() || dim < 16 {
            return Err(Error::ParameterValidation(
                "ring dimension must be a power of two of at least 16",
            ));
        }
        if q < 2 || q % (2 * dim as u64) != 1 {
            return Err(Error::ParameterValidation("q must be 1 mod 2m"));
        }
        let psi = Self::find_primitive_root(2 * dim as u64, q)?;
        Ok(Self { dim, q, psi })
    }

    /// The ring dimension m.
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// The modulus q.
    pub fn modulus(&self) -> u64 {
        self.q
    }

    /// The primitive 2m-th root of unity located at construction.
    pub fn root_of_unity(&self) -> u64 {
        self.psi
    }

    /// Find a primitive n-th root of unity mod q, for n a power of two.
    ///
    /// A candidate g^((q-1)/n) always satisfies x^n = 1; since n is a power
    /// of two its order is exactly n iff x^(n/2) != 1.
    fn find_primitive_root(n: u64, q: u64) -> Result<u64> {
        let exp = (q - 1) / n;
        for g in 2..=256u64 {
            let candidate = mod_pow(g, exp, q);
            if mod_pow(candidate, n, q) == 1 && mod_pow(candidate, n / 2, q) != 1 {
                return Ok(candidate);
            }
        }
        Err(Error::ParameterValidation("no primitive root of unity found"))
    }

    /// Sample a polynomial with independent uniform coefficients in `[0, q)`.
    pub fn uniform_poly<R: Rng + ?Sized>(&self, rng: &mut R) -> Poly {
        let coeffs = (0..self.dim).map(|_| rng.gen_range(0..self.q)).collect();
        Poly {
            coeffs,
            q: self.q,
        }
    }

    /// Sample a polynomial with discrete-Gaussian coefficients of width
    /// `sigma`, truncated at `bound`, mapped into `[0, q)`.
    pub fn gaussian_poly<R: Rng + ?Sized>(&self, rng: &mut R, sigma: f64, bound: f64) -> Poly {
        let coeffs = (0..self.dim)
            .map(|_| sample_z_centered(rng, sigma, bound, self.q))
            .collect();
        Poly {
            coeffs,
            q: self.q,
        }
    }

    /// Read a polynomial's coefficients out as a finite-field vector.
    pub fn poly_to_vector(&self, poly: &Poly) -> Vector {
        Vector::from_values(poly.coeffs.clone(), self.q)
    }
}

/// Sample a length-`length` Gaussian coefficient vector from a generator
/// keyed by `seed`.
///
/// The same seed always produces the same vector; decapsulation relies on
/// this to re-derive the encapsulation noise from the recovered `rho`.
pub fn deterministic_gaussian_vector(
    length: usize,
    sigma: f64,
    seed: &[u8],
    q: u64,
) -> Result<Vector> {
    let ring = Ring::new(length, q)?;
    let mut sampler = GaussianSampler::from_seed(sigma, q as f64, seed);
    let coeffs = sampler.sample_vec_centered(ring.dimension(), q);
    Ok(Vector::from_values(coeffs, q))
}
