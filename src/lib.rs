//! OW-ChCCA-KEM: a lattice-based key encapsulation mechanism.
//!
//! This crate implements the OW-ChCCA construction over the Learning With
//! Errors problem, following the authenticated-key-exchange design of
//! Pan, Wagner and Zeng (2023).
//!
//! Key components:
//! - Dual-branch public keys `(A, U0, U1)` where a secret bit selects which
//!   branch carries the structured product `A·Zb`
//! - Seed-driven encapsulation: one λ/8-byte seed expands into the LWE
//!   secret, the deterministic noise seed, and both selector bit vectors
//! - Decapsulation with four independent integrity checks that collapse to
//!   a single rejection value
//! - A parameter calculator deriving `(n, m, q, Gaussians)` from a security
//!   level, backed by an NTT-friendly prime search
//!
//! # Example
//!
//! ```
//! use owchcca_kem::{decapsulate, encapsulate, generate_key_pair};
//! use owchcca_kem::params::get_default_parameter_set;
//! use rand::rngs::OsRng;
//!
//! let params = get_default_parameter_set();
//! let (pk, sk) = generate_key_pair(&params, &mut OsRng).unwrap();
//! let (ciphertext, shared) = encapsulate(&pk, &mut OsRng).unwrap();
//! let recovered = decapsulate(&sk, &ciphertext).unwrap();
//! assert_eq!(shared, recovered);
//! ```

pub mod error;
pub mod expand;
pub mod kem;
pub mod math;
pub mod params;
pub mod primes;

pub use error::{Error, Result};
pub use kem::{decapsulate, encapsulate, generate_key_pair, OwChCcaKem, PrivateKey, PublicKey};
pub use params::{
    calculate_parameters, default_parameters, get_default_parameter_set, get_parameter_set,
    list_parameter_sets, register_parameter_set, set_default_parameter_set, Parameters,
    SecurityLevel,
};
