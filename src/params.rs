//! Parameter sets for the OW-ChCCA KEM.
//!
//! This module derives lattice dimensions, the NTT-friendly modulus, and the
//! Gaussian widths from a security level, validates the result, and manages
//! the process-wide registry of named parameter sets.
//!
//! # Overview
//!
//! For a security level λ the calculator fixes `n = 8λ` and `k = λ`, then
//! searches power-of-two sample counts `m` until an NTT-friendly prime
//! modulus of about `m / 2n` bits (clamped to 60..62) exists with
//! `q ≡ 1 (mod 2m)`. The Gaussian widths follow the paper's presets:
//! `α = γ = η = √n` and `α' = n^2.5 · m`.
//!
//! Note that `n = 8λ` is an engineering preset; the paper's analysis uses
//! `n = 70λ`. Deployments that need the paper's security margins must scale
//! `n` accordingly.
//!
//! # Example
//!
//! ```
//! use owchcca_kem::params::{calculate_parameters, SecurityLevel};
//!
//! let params = calculate_parameters(SecurityLevel::Bits16).unwrap();
//! assert!(params.validate().is_ok());
//! assert_eq!(params.n, 128);
//! assert_eq!(params.shared_secret_bytes, 2);
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::math::ring::Ring;
use crate::math::vector::element_size;
use crate::primes::NttFriendlyPrimeGenerator;

/// Standardized security level in bits.
///
/// The registry seeds parameter sets for the 16, 32 and 64 bit levels; the
/// higher levels are accepted by [`calculate_parameters`] but not
/// pre-registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityLevel {
    /// 16-bit security (development and testing).
    Bits16,
    /// 32-bit security (development and testing).
    Bits32,
    /// 64-bit security.
    Bits64,
    /// 128-bit security.
    Bits128,
    /// 192-bit security.
    Bits192,
    /// 256-bit security.
    Bits256,
}

impl SecurityLevel {
    /// The level in bits.
    pub fn bits(self) -> usize {
        match self {
            SecurityLevel::Bits16 => 16,
            SecurityLevel::Bits32 => 32,
            SecurityLevel::Bits64 => 64,
            SecurityLevel::Bits128 => 128,
            SecurityLevel::Bits192 => 192,
            SecurityLevel::Bits256 => 256,
        }
    }

    /// Canonical parameter-set name, e.g. `OWChCCA-16`.
    pub fn parameter_set_name(self) -> String {
        format!("OWChCCA-{}", self.bits())
    }
}

/// Core parameters binding every KEM operation.
///
/// Immutable once constructed. The serialized sizes are derived from the
/// lattice dimensions and the element width `ceil(bitlen(q) / 8)` and cached
/// here so callers can allocate without recomputing.
///
/// # Fields
///
/// * `n`, `m` - lattice dimension and sample count; `m` is a power of two
/// * `q` - prime modulus with `q ≡ 1 (mod 2m)`
/// * `alpha`, `gamma`, `eta` - secret-side Gaussian widths, all `√n`
/// * `alpha_prime` - encapsulation-noise width `n^2.5 · m`
///
/// # Example
///
/// ```
/// use owchcca_kem::params::get_default_parameter_set;
///
/// let params = get_default_parameter_set();
/// assert_eq!(params.name, "OWChCCA-16");
/// assert_eq!(params.k, params.lambda);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameters {
    /// Human-readable parameter-set name.
    pub name: String,
    /// Security level this set was derived from.
    pub security_level: SecurityLevel,
    /// Lattice dimension `n = 8λ`.
    pub n: usize,
    /// Number of samples; a power of two so the ring of dimension m exists.
    pub m: usize,
    /// Security parameter λ in bits.
    pub lambda: usize,
    /// Key dimension `k = λ`.
    pub k: usize,
    /// Bit size of the modulus, clamped to 60..62.
    pub log_q: usize,
    /// Prime modulus with `q ≡ 1 (mod 2m)`.
    pub q: u64,
    /// Secret Gaussian width `α = √n`.
    pub alpha: f64,
    /// Encapsulation-noise Gaussian width `α' = n^2.5 · m`.
    pub alpha_prime: f64,
    /// Rejection parameter `γ = √n`.
    pub gamma: f64,
    /// Bound parameter `η = √n`.
    pub eta: f64,
    /// `⌈log2(η)⌉`; seed expansion packs `log_eta + 1` bits per entry of s.
    pub log_eta: usize,
    /// Serialized public key size in bytes.
    pub public_key_bytes: usize,
    /// Serialized private key size in bytes.
    pub private_key_bytes: usize,
    /// Ciphertext size in bytes.
    pub ciphertext_bytes: usize,
    /// Shared secret size in bytes: λ/8.
    pub shared_secret_bytes: usize,
}

/// `⌈log2(x)⌉` for `x ≥ 1`.
fn ceil_log2(x: usize) -> usize {
    (usize::BITS - (x - 1).leading_zeros()) as usize
}

impl Parameters {
    /// Bytes per encoded field element: `ceil(bitlen(q) / 8)`.
    pub fn element_size(&self) -> usize {
        element_size(self.q)
    }

    /// Serialized public key size: `encode(A) ∥ encode(U0) ∥ encode(U1)`.
    pub fn public_key_size(&self) -> usize {
        let el = self.element_size();
        let a_size = 8 + self.n * self.m * el;
        let u_size = 8 + self.n * self.lambda * el;
        a_size + 2 * u_size
    }

    /// Serialized private key size: `encode(Zb) ∥ branch flag`.
    pub fn private_key_size(&self) -> usize {
        let el = self.element_size();
        (8 + self.m * self.lambda * el) + 1
    }

    /// Ciphertext size: `c0 ∥ c1 ∥ encode(x) ∥ encode(hatH0) ∥ encode(hatH1)`.
    pub fn ciphertext_size(&self) -> usize {
        let el = self.element_size();
        let c_size = self.lambda / 8;
        let x_size = 4 + self.m * el;
        let h_size = 4 + self.lambda * el;
        2 * c_size + x_size + 2 * h_size
    }

    /// Shared secret size: λ/8.
    pub fn shared_secret_size(&self) -> usize {
        self.lambda / 8
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidSharedParams`] when required fields are unset
    /// * [`Error::ParameterValidation`] when the dimensions, Gaussian widths
    ///   or the ring of dimension m over q are inconsistent
    pub fn validate(&self) -> Result<()> {
        if self.q == 0 || self.name.is_empty() {
            return Err(Error::InvalidSharedParams);
        }
        if self.n == 0 || self.m == 0 || self.lambda == 0 {
            return Err(Error::ParameterValidation("invalid dimension parameters"));
        }
        if self.k != self.lambda {
            return Err(Error::ParameterValidation("k should equal lambda"));
        }

        let sqrt_n = (self.n as f64).sqrt();
        let epsilon = 0.01;
        if (self.alpha - sqrt_n).abs() > epsilon {
            return Err(Error::ParameterValidation("alpha should be sqrt(n)"));
        }
        if (self.gamma - sqrt_n).abs() > epsilon {
            return Err(Error::ParameterValidation("gamma should be sqrt(n)"));
        }
        if (self.eta - sqrt_n).abs() > epsilon {
            return Err(Error::ParameterValidation("eta should be sqrt(n)"));
        }

        let expected_alpha_prime = (self.n as f64).powf(2.5) * self.m as f64;
        if (self.alpha_prime - expected_alpha_prime).abs() / expected_alpha_prime > 0.05 {
            return Err(Error::ParameterValidation("alpha' should be n^2.5 * m"));
        }

        Ring::new(self.m, self.q)?;

        Ok(())
    }
}

/// Derive a complete parameter set for the given security level.
///
/// Sets `n = 8λ` and `k = λ`, then walks candidate power-of-two sample
/// counts `m` in `[2^ceil(log2(6n log n)), 2^ceil(log2(7n log n))]`. For
/// each candidate, a downstream prime of `clamp(m/2n, 60, 62) + 1` bits with
/// `nth_root = 2m` is sought; the first candidate that yields one wins.
///
/// # Errors
///
/// [`Error::PrimeExhausted`] when no candidate `m` admits a prime.
///
/// # Example
///
/// ```
/// use owchcca_kem::params::{calculate_parameters, SecurityLevel};
///
/// let params = calculate_parameters(SecurityLevel::Bits32).unwrap();
/// assert_eq!(params.n, 256);
/// assert_eq!(params.q % (2 * params.m as u64), 1);
/// ```
pub fn calculate_parameters(level: SecurityLevel) -> Result<Parameters> {
    let lambda = level.bits();
    let n = 8 * lambda;
    let k = lambda;
    let log_n = ceil_log2(n);

    let min_m = 6 * n * log_n + 1;
    let max_m = 7 * n * log_n;
    let min_log_m = ceil_log2(min_m);
    let max_log_m = ceil_log2(max_m);

    let mut found: Option<(usize, usize, u64)> = None;
    let mut m = 1usize << min_log_m;
    while m <= (1usize << max_log_m) {
        let log_q = (m / (2 * n)).clamp(60, 62);
        let mut generator = NttFriendlyPrimeGenerator::new(log_q as u32 + 1, 2 * m as u64)?;
        match generator.next_downstream_prime() {
            Ok(q) => {
                debug!(m, log_q, q, "parameter search found modulus");
                found = Some((m, log_q, q));
                break;
            }
            Err(_) => {
                debug!(m, log_q, "no prime for candidate sample count");
                m <<= 1;
            }
        }
    }
    let (m, log_q, q) = found.ok_or(Error::PrimeExhausted)?;

    let sqrt_n = (n as f64).sqrt();
    let alpha = sqrt_n;
    let gamma = sqrt_n;
    let eta = sqrt_n;
    let log_eta = eta.log2().ceil() as usize;
    let alpha_prime = (n as f64).powf(2.5) * m as f64;

    let mut params = Parameters {
        name: level.parameter_set_name(),
        security_level: level,
        n,
        m,
        lambda,
        k,
        log_q,
        q,
        alpha,
        alpha_prime,
        gamma,
        eta,
        log_eta,
        public_key_bytes: 0,
        private_key_bytes: 0,
        ciphertext_bytes: 0,
        shared_secret_bytes: 0,
    };
    params.public_key_bytes = params.public_key_size();
    params.private_key_bytes = params.private_key_size();
    params.ciphertext_bytes = params.ciphertext_size();
    params.shared_secret_bytes = params.shared_secret_size();
    Ok(params)
}

struct Registry {
    sets: HashMap<String, Parameters>,
    default_name: String,
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| {
    let mut sets = HashMap::new();
    for level in [
        SecurityLevel::Bits16,
        SecurityLevel::Bits32,
        SecurityLevel::Bits64,
    ] {
        let params =
            calculate_parameters(level).expect("seeded parameter set must be constructible");
        sets.insert(params.name.clone(), params);
    }
    RwLock::new(Registry {
        sets,
        default_name: SecurityLevel::Bits16.parameter_set_name(),
    })
});

/// Add a parameter set to the registry, replacing any set of the same name.
pub fn register_parameter_set(params: Parameters) {
    let mut registry = REGISTRY.write().unwrap();
    debug!(name = %params.name, "registering parameter set");
    registry.sets.insert(params.name.clone(), params);
}

/// Retrieve a parameter set by name.
pub fn get_parameter_set(name: &str) -> Result<Parameters> {
    let registry = REGISTRY.read().unwrap();
    registry
        .sets
        .get(name)
        .cloned()
        .ok_or(Error::ParameterValidation("parameter set not found"))
}

/// The default parameter set (initially `OWChCCA-16`).
pub fn get_default_parameter_set() -> Parameters {
    let registry = REGISTRY.read().unwrap();
    registry.sets[&registry.default_name].clone()
}

/// Change which registered set is the default.
pub fn set_default_parameter_set(name: &str) -> Result<()> {
    let mut registry = REGISTRY.write().unwrap();
    if !registry.sets.contains_key(name) {
        return Err(Error::ParameterValidation("parameter set not found"));
    }
    debug!(name, "setting default parameter set");
    registry.default_name = name.to_string();
    Ok(())
}

/// Names of all registered parameter sets.
pub fn list_parameter_sets() -> Vec<String> {
    let registry = REGISTRY.read().unwrap();
    registry.sets.keys().cloned().collect()
}

/// Parameter set for `level`, calculating and registering it on first use.
pub fn default_parameters(level: SecurityLevel) -> Result<Parameters> {
    let name = level.parameter_set_name();
    if let Ok(params) = get_parameter_set(&name) {
        return Ok(params);
    }
    let params = calculate_parameters(level)?;
    register_parameter_set(params.clone());
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_parameters_default_levels() {
        for level in [
            SecurityLevel::Bits16,
            SecurityLevel::Bits32,
            SecurityLevel::Bits64,
        ] {
            let params = calculate_parameters(level).unwrap();
            params.validate().unwrap();
            assert!(params.public_key_bytes > 0);
            assert!(params.private_key_bytes > 0);
            assert!(params.ciphertext_bytes > 0);
            assert!(params.shared_secret_bytes > 0);
        }
    }

    #[test]
    fn test_parameter_structure_level16() {
        let params = calculate_parameters(SecurityLevel::Bits16).unwrap();
        assert_eq!(params.name, "OWChCCA-16");
        assert_eq!(params.n, 128);
        assert_eq!(params.k, 16);
        assert_eq!(params.lambda, 16);
        assert_eq!(params.m, 8192);
        assert_eq!(params.log_q, 60);
        assert_eq!(params.log_eta, 4);
        assert_eq!(params.shared_secret_bytes, 2);
        assert!(params.m.is_power_of_two());
        assert_eq!(params.q % (2 * params.m as u64), 1);
    }

    #[test]
    fn test_modulus_bit_size_is_clamped() {
        for level in [SecurityLevel::Bits16, SecurityLevel::Bits32] {
            let params = calculate_parameters(level).unwrap();
            assert!(params.log_q >= 60 && params.log_q <= 62);
            assert_eq!(params.element_size(), 8);
        }
    }

    #[test]
    fn test_size_formulas() {
        let params = calculate_parameters(SecurityLevel::Bits16).unwrap();
        let el = params.element_size();
        let expected_pk =
            (8 + params.n * params.m * el) + 2 * (8 + params.n * params.lambda * el);
        assert_eq!(params.public_key_bytes, expected_pk);

        let expected_sk = (8 + params.m * params.lambda * el) + 1;
        assert_eq!(params.private_key_bytes, expected_sk);

        let expected_ct = 2 * (params.lambda / 8)
            + (4 + params.m * el)
            + 2 * (4 + params.lambda * el);
        assert_eq!(params.ciphertext_bytes, expected_ct);
    }

    #[test]
    fn test_gaussian_presets() {
        let params = calculate_parameters(SecurityLevel::Bits64).unwrap();
        let sqrt_n = (params.n as f64).sqrt();
        assert!((params.alpha - sqrt_n).abs() < 1e-9);
        assert!((params.gamma - sqrt_n).abs() < 1e-9);
        assert!((params.eta - sqrt_n).abs() < 1e-9);
        let expected = (params.n as f64).powf(2.5) * params.m as f64;
        assert!((params.alpha_prime - expected).abs() / expected < 1e-9);
        assert_eq!(params.log_eta, 5);
    }

    #[test]
    fn test_validate_rejects_k_mismatch() {
        let mut params = calculate_parameters(SecurityLevel::Bits16).unwrap();
        params.k += 1;
        assert!(matches!(
            params.validate(),
            Err(Error::ParameterValidation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_wrong_alpha() {
        let mut params = calculate_parameters(SecurityLevel::Bits16).unwrap();
        params.alpha *= 2.0;
        assert!(matches!(
            params.validate(),
            Err(Error::ParameterValidation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_wrong_alpha_prime() {
        let mut params = calculate_parameters(SecurityLevel::Bits16).unwrap();
        params.alpha_prime *= 1.1;
        assert!(matches!(
            params.validate(),
            Err(Error::ParameterValidation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unset_modulus() {
        let mut params = calculate_parameters(SecurityLevel::Bits16).unwrap();
        params.q = 0;
        assert_eq!(params.validate(), Err(Error::InvalidSharedParams));
    }

    #[test]
    fn test_validate_rejects_zero_dimension() {
        let mut params = calculate_parameters(SecurityLevel::Bits16).unwrap();
        params.n = 0;
        assert!(matches!(
            params.validate(),
            Err(Error::ParameterValidation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unconstructible_ring() {
        let mut params = calculate_parameters(SecurityLevel::Bits16).unwrap();
        params.m += 1;
        assert!(matches!(
            params.validate(),
            Err(Error::ParameterValidation(_))
        ));
    }

    #[test]
    fn test_registry_seeded_sets() {
        let names = list_parameter_sets();
        for expected in ["OWChCCA-16", "OWChCCA-32", "OWChCCA-64"] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
        assert_eq!(get_default_parameter_set().name, "OWChCCA-16");
    }

    #[test]
    fn test_registry_lookup() {
        let params = get_parameter_set("OWChCCA-32").unwrap();
        assert_eq!(params.lambda, 32);
        assert!(get_parameter_set("OWChCCA-999").is_err());
    }

    #[test]
    fn test_registry_register_and_lookup() {
        let mut params = calculate_parameters(SecurityLevel::Bits16).unwrap();
        params.name = "OWChCCA-16-test-clone".to_string();
        register_parameter_set(params.clone());
        let fetched = get_parameter_set("OWChCCA-16-test-clone").unwrap();
        assert_eq!(fetched.q, params.q);
    }

    #[test]
    fn test_set_default_rejects_unknown_name() {
        assert!(set_default_parameter_set("no-such-set").is_err());
        assert!(set_default_parameter_set("OWChCCA-16").is_ok());
    }

    #[test]
    fn test_default_parameters_lookup_or_calculate() {
        // Registered level: served from the registry.
        let params = default_parameters(SecurityLevel::Bits32).unwrap();
        assert_eq!(params.name, "OWChCCA-32");
    }

    #[test]
    fn test_ceil_log2() {
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(3), 2);
        assert_eq!(ceil_log2(4096), 12);
        assert_eq!(ceil_log2(4097), 13);
    }
}
