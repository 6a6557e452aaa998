//! Mathematical primitives for the OW-ChCCA KEM.
//!
//! - **Finite-field vectors and matrices** over Z_q with the length-prefixed
//!   big-endian wire encoding
//! - **Discrete Gaussian sampling** for secret and error terms
//! - **Ring layer** providing whole-polynomial samplers and the
//!   coefficient-wise product path used for the keygen matrix product

pub mod gaussian;
pub mod matrix;
pub mod ring;
pub mod vector;

pub use gaussian::GaussianSampler;
pub use matrix::Matrix;
pub use ring::{deterministic_gaussian_vector, Poly, Ring};
pub use vector::Vector;
