//! KEM core: key generation, encapsulation and decapsulation.
//!
//! Keys bind a [`Parameters`] value. The public key holds the shared lattice
//! matrix `A` and the dual branch matrices `(U0, U1)`, exactly one of which
//! is the structured product `A·Zb`; the private key holds the short secret
//! `Zb`, the branch bit, and its own copy of the public key.
//!
//! Wire formats are bit-exact:
//!
//! * public key: `encode(A) ∥ encode(U0) ∥ encode(U1)`
//! * private key: `encode(Zb) ∥ branch flag byte`
//! * ciphertext: `c0 ∥ c1 ∥ encode(x) ∥ encode(hatH0) ∥ encode(hatH1)`

use rand::{CryptoRng, RngCore};
use rayon::prelude::*;
use subtle::ConstantTimeEq;
use tiny_keccak::{Hasher, Sha3};
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::expand::{expand_seed, kdf};
use crate::math::ring::deterministic_gaussian_vector;
use crate::math::{Matrix, Ring, Vector};
use crate::params::Parameters;

/// OW-ChCCA public key.
#[derive(Debug, Clone)]
pub struct PublicKey {
    params: Parameters,
    a: Matrix,
    u0: Matrix,
    u1: Matrix,
}

/// OW-ChCCA private key.
///
/// Owns a copy of its public key; the Gaussian secret is wiped on drop.
#[derive(Debug, Clone)]
pub struct PrivateKey {
    pk: PublicKey,
    zb: Matrix,
    b: bool,
}

impl PublicKey {
    /// The parameter set this key binds to.
    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Serialize as `encode(A) ∥ encode(U0) ∥ encode(U1)`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.params.public_key_bytes);
        buf.extend_from_slice(&self.a.encode()?);
        buf.extend_from_slice(&self.u0.encode()?);
        buf.extend_from_slice(&self.u1.encode()?);
        Ok(buf)
    }

    /// Parse a public key for the given parameter set.
    pub fn from_bytes(data: &[u8], params: &Parameters) -> Result<Self> {
        params.validate()?;
        if data.len() != params.public_key_bytes {
            return Err(Error::Deserialization("public key length mismatch"));
        }
        let el = params.element_size();
        let a_size = 8 + params.n * params.m * el;
        let u_size = 8 + params.n * params.lambda * el;

        let a = Matrix::decode(&data[..a_size], params.n, params.m, params.q)?;
        let u0 = Matrix::decode(&data[a_size..a_size + u_size], params.n, params.lambda, params.q)?;
        let u1 = Matrix::decode(&data[a_size + u_size..], params.n, params.lambda, params.q)?;

        Ok(Self {
            params: params.clone(),
            a,
            u0,
            u1,
        })
    }

    fn validate(&self) -> Result<()> {
        let p = &self.params;
        let shape_ok = self.a.rows() == p.n
            && self.a.cols() == p.m
            && self.u0.rows() == p.n
            && self.u0.cols() == p.lambda
            && self.u1.rows() == p.n
            && self.u1.cols() == p.lambda
            && self.a.modulus() == p.q
            && p.q != 0;
        if !shape_ok {
            return Err(Error::InvalidPublicKey);
        }
        Ok(())
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.params.name == other.params.name
            && self.a == other.a
            && self.u0 == other.u0
            && self.u1 == other.u1
    }
}

impl Eq for PublicKey {}

impl PrivateKey {
    /// The matching public key.
    pub fn public(&self) -> &PublicKey {
        &self.pk
    }

    /// Serialize as `encode(Zb) ∥ branch flag byte`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.pk.params.private_key_bytes);
        buf.extend_from_slice(&self.zb.encode()?);
        buf.push(self.b as u8);
        Ok(buf)
    }

    /// Parse a private key against its public key.
    ///
    /// The public key must be supplied; the serialized form carries only the
    /// secret matrix and the branch flag.
    pub fn from_bytes(data: &[u8], pk: Option<&PublicKey>) -> Result<Self> {
        let pk = pk.ok_or(Error::InvalidPublicKey)?;
        let params = &pk.params;
        if data.len() != params.private_key_bytes {
            return Err(Error::Deserialization("private key length mismatch"));
        }
        let zb_size = 8 + params.m * params.lambda * params.element_size();
        let zb = Matrix::decode(&data[..zb_size], params.m, params.lambda, params.q)?;
        let flag = data[zb_size];
        if flag > 1 {
            return Err(Error::Deserialization("invalid branch flag"));
        }
        Ok(Self {
            pk: pk.clone(),
            zb,
            b: flag == 1,
        })
    }

    fn validate(&self) -> Result<()> {
        let p = &self.pk.params;
        if self.zb.rows() != p.m || self.zb.cols() != p.lambda || self.pk.validate().is_err() {
            return Err(Error::InvalidPrivateKey);
        }
        Ok(())
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.b == other.b && self.zb == other.zb && self.pk == other.pk
    }
}

impl Eq for PrivateKey {}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.zb.zeroize();
    }
}

/// KEM instance bound to a parameter set.
///
/// Thin façade over the module's free functions that also carries the
/// serialized-size contracts, for callers that allocate buffers up front.
#[derive(Debug, Clone)]
pub struct OwChCcaKem {
    params: Parameters,
}

impl OwChCcaKem {
    /// Create an instance after validating the parameter set.
    pub fn new(params: Parameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// The bound parameter set.
    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Size in bytes of encoded public keys.
    pub fn public_key_size(&self) -> usize {
        self.params.public_key_bytes
    }

    /// Size in bytes of encoded private keys.
    pub fn private_key_size(&self) -> usize {
        self.params.private_key_bytes
    }

    /// Size in bytes of ciphertexts.
    pub fn ciphertext_size(&self) -> usize {
        self.params.ciphertext_bytes
    }

    /// Size in bytes of shared secrets.
    pub fn shared_secret_size(&self) -> usize {
        self.params.shared_secret_bytes
    }

    /// Generate a key pair; see [`generate_key_pair`].
    pub fn generate_key_pair<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(PublicKey, PrivateKey)> {
        generate_key_pair(&self.params, rng)
    }

    /// Encapsulate to a public key; see [`encapsulate`].
    pub fn encapsulate<R: RngCore + CryptoRng>(
        &self,
        pk: &PublicKey,
        rng: &mut R,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        encapsulate(pk, rng)
    }

    /// Decapsulate a ciphertext; see [`decapsulate`].
    pub fn decapsulate(&self, sk: &PrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
        decapsulate(sk, ciphertext)
    }
}

/// Generate a key pair from the given randomness stream.
///
/// The shared matrix `A` is drawn as `n` uniform ring polynomials, the
/// secret `Zb` as `λ` Gaussian column polynomials of width `α`, and the
/// branch bit decides which of `(U0, U1)` receives `A·Zb`; the other branch
/// is fresh uniform noise. Identical streams produce identical keys.
pub fn generate_key_pair<R: RngCore + CryptoRng>(
    params: &Parameters,
    rng: &mut R,
) -> Result<(PublicKey, PrivateKey)> {
    params.validate()?;

    let (n, m, lambda, q) = (params.n, params.m, params.lambda, params.q);
    let ring = Ring::new(m, q)?;

    // Shared matrix A, one uniform row polynomial at a time.
    let a_polys: Vec<_> = (0..n).map(|_| ring.uniform_poly(rng)).collect();
    let mut a = Matrix::new(n, m, q);
    for (i, poly) in a_polys.iter().enumerate() {
        for (j, &c) in poly.coeffs().iter().enumerate() {
            a.set(i, j, c);
        }
    }

    let mut flag = [0u8; 1];
    rng.try_fill_bytes(&mut flag)
        .map_err(|_| Error::InvalidRandomSource)?;
    let b = flag[0] & 1 == 1;

    // Zb column by column; each column is one Gaussian polynomial.
    let zb_polys: Vec<_> = (0..lambda)
        .map(|_| ring.gaussian_poly(rng, params.alpha, q as f64))
        .collect();
    let mut zb = Matrix::new(m, lambda, q);
    for (j, poly) in zb_polys.iter().enumerate() {
        for (i, &c) in poly.coeffs().iter().enumerate() {
            zb.set(i, j, c);
        }
    }

    // AZ[i][j] = <row i of A, column j of Zb>, taken through the ring as a
    // coefficient-wise product followed by a coefficient sum. Sampling is
    // done, so the row fan-out is pure computation and stays deterministic.
    let az_rows: Vec<Vec<u64>> = a_polys
        .par_iter()
        .map(|row| {
            zb_polys
                .iter()
                .map(|col| row.mul_coeffs(col).coeff_sum())
                .collect()
        })
        .collect();
    let mut az = Matrix::new(n, lambda, q);
    for (i, row) in az_rows.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            az.set(i, j, v);
        }
    }

    let w = Matrix::random(n, lambda, q, rng);
    let (u0, u1) = if b { (w, az) } else { (az, w) };

    let pk = PublicKey {
        params: params.clone(),
        a,
        u0,
        u1,
    };
    let sk = PrivateKey {
        pk: pk.clone(),
        zb,
        b,
    };
    Ok((pk, sk))
}

/// Encapsulate a fresh shared secret to `pk`.
///
/// Returns `(ciphertext, shared_secret)`.
pub fn encapsulate<R: RngCore + CryptoRng>(
    pk: &PublicKey,
    rng: &mut R,
) -> Result<(Vec<u8>, Vec<u8>)> {
    pk.validate()?;
    let params = &pk.params;
    let q = params.q;
    let key_len = params.shared_secret_bytes;

    let mut r = vec![0u8; params.lambda / 8];
    rng.try_fill_bytes(&mut r)
        .map_err(|_| Error::InvalidRandomSource)?;

    let mut expanded = expand_seed(&r, params.n, params.lambda, params.log_eta);
    expanded.s.set_modulus(q);

    let e = deterministic_gaussian_vector(params.m, params.alpha_prime, &expanded.rho, q)?;

    // x = A^T s + e
    let x = pk.a.transpose().multiply_vector(&expanded.s)?.add(&e)?;

    // hatHi = Ui^T s + hi * floor(q/2)
    let u0ts = pk.u0.transpose().multiply_vector(&expanded.s)?;
    let hat_h0 = compute_hat_h(&u0ts, &expanded.h0, q)?;
    let u1ts = pk.u1.transpose().multiply_vector(&expanded.s)?;
    let hat_h1 = compute_hat_h(&u1ts, &expanded.h1, q)?;

    let hat_k0 = hash3(&x, &hat_h0, &expanded.h0)?;
    let hat_k1 = hash3(&x, &hat_h1, &expanded.h1)?;

    let c0 = xor_bytes(&hat_k0[..key_len], &r);
    let c1 = xor_bytes(&hat_k1[..key_len], &r);

    let ciphertext = construct_ciphertext(&c0, &c1, &x, &hat_h0, &hat_h1)?;
    let shared_secret = kdf(&r, key_len);
    r.zeroize();

    Ok((ciphertext, shared_secret))
}

/// Recover the shared secret from a ciphertext, or reject it.
///
/// The recomputation walks both branches: the private branch recovers the
/// seed through rounding, the public branch is re-derived from the expanded
/// seed, and four predicates must all hold before the secret is released.
/// Any mismatch collapses to the same [`Error::DecapsulationFailed`] value.
pub fn decapsulate(sk: &PrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
    sk.validate()?;
    let pk = &sk.pk;
    let params = &pk.params;
    let q = params.q;
    let key_len = params.shared_secret_bytes;

    let (c0, c1, x, hat_h0, hat_h1) = parse_ciphertext(ciphertext, params)?;

    let (cb, cnb) = if sk.b { (&c1, &c0) } else { (&c0, &c1) };
    let (hat_hb, hat_hnb) = if sk.b { (&hat_h1, &hat_h0) } else { (&hat_h0, &hat_h1) };
    let unb = if sk.b { &pk.u0 } else { &pk.u1 };

    // Private branch: round hatHb - Zb^T x back to the selector bits.
    let zbtx = sk.zb.transpose().multiply_vector(&x)?;
    let diff = hat_hb.sub(&zbtx)?;
    let hb_prime = round_vector(&diff, q);

    let hat_kb = hash3(&x, hat_hb, &hb_prime)?;
    let mut r = xor_bytes(cb, &hat_kb[..key_len]);

    let mut expanded = expand_seed(&r, params.n, params.lambda, params.log_eta);
    expanded.s.set_modulus(q);
    let (hb, hnb) = if sk.b {
        (&expanded.h1, &expanded.h0)
    } else {
        (&expanded.h0, &expanded.h1)
    };

    // Public branch, recomputed from the recovered seed.
    let unbts = unb.transpose().multiply_vector(&expanded.s)?;
    let hat_hnb_prime = compute_hat_h(&unbts, hnb, q)?;
    let hat_knb = hash3(&x, &hat_hnb_prime, hnb)?;

    let e = deterministic_gaussian_vector(params.m, params.alpha_prime, &expanded.rho, q)?;
    let x_prime = pk.a.transpose().multiply_vector(&expanded.s)?.add(&e)?;

    let x_ok = x == x_prime;
    let cnb_calculated = xor_bytes(&hat_knb[..key_len], &r);
    let cnb_ok = bool::from(cnb.as_slice().ct_eq(&cnb_calculated));
    let selector_ok = hb_prime == *hb;
    let hat_hnb_ok = hat_hnb_prime == *hat_hnb;

    if !(x_ok && cnb_ok && selector_ok && hat_hnb_ok) {
        r.zeroize();
        return Err(Error::DecapsulationFailed);
    }

    let shared_secret = kdf(&r, key_len);
    r.zeroize();
    Ok(shared_secret)
}

/// `H(x, hatH, h)`: SHA3-256 over the length-prefixed encodings.
fn hash3(x: &Vector, hat_h: &Vector, h: &Vector) -> Result<[u8; 32]> {
    let mut hasher = Sha3::v256();
    hasher.update(&x.encode()?);
    hasher.update(&hat_h.encode()?);
    hasher.update(&h.encode()?);
    let mut digest = [0u8; 32];
    hasher.finalize(&mut digest);
    Ok(digest)
}

/// `U^T s + h * floor(q/2)`, lifting the bit vector into Z_q first.
fn compute_hat_h(uts: &Vector, h: &Vector, q: u64) -> Result<Vector> {
    let lifted = Vector::from_values(h.values().to_vec(), q);
    uts.add(&lifted.scalar_mul(q >> 1))
}

/// Round each element to the closer of 0 and `floor(q/2)` in the circular
/// metric on Z_q; ties go to 0. Returns a bit vector over Z_2.
fn round_vector(v: &Vector, q: u64) -> Vector {
    let half_q = q >> 1;
    let values = v
        .values()
        .iter()
        .map(|&val| {
            let dist_to_zero = if val > half_q { q - val } else { val };
            let dist_to_half = if val >= half_q { val - half_q } else { half_q - val };
            u64::from(dist_to_zero > dist_to_half)
        })
        .collect();
    Vector::from_values(values, 2)
}

fn xor_bytes(a: &[u8], b: &[u8]) -> Vec<u8> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&x, &y)| x ^ y).collect()
}

fn construct_ciphertext(
    c0: &[u8],
    c1: &[u8],
    x: &Vector,
    hat_h0: &Vector,
    hat_h1: &Vector,
) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(
        c0.len()
            + c1.len()
            + Vector::encoded_size(x.len(), x.modulus())
            + 2 * Vector::encoded_size(hat_h0.len(), hat_h0.modulus()),
    );
    buf.extend_from_slice(c0);
    buf.extend_from_slice(c1);
    buf.extend_from_slice(&x.encode()?);
    buf.extend_from_slice(&hat_h0.encode()?);
    buf.extend_from_slice(&hat_h1.encode()?);
    Ok(buf)
}

/// Split a ciphertext into `(c0, c1, x, hatH0, hatH1)`.
///
/// The total length and every embedded length prefix must agree with the
/// parameter set.
#[allow(clippy::type_complexity)]
fn parse_ciphertext(
    ciphertext: &[u8],
    params: &Parameters,
) -> Result<(Vec<u8>, Vec<u8>, Vector, Vector, Vector)> {
    if ciphertext.len() != params.ciphertext_bytes {
        return Err(Error::InvalidCiphertext);
    }

    let c_size = params.lambda / 8;
    let el = params.element_size();
    let x_size = 4 + params.m * el;
    let h_size = 4 + params.lambda * el;

    let c0 = ciphertext[..c_size].to_vec();
    let c1 = ciphertext[c_size..2 * c_size].to_vec();

    let mut pos = 2 * c_size;
    let x = Vector::decode(&ciphertext[pos..pos + x_size], params.m, params.q)
        .map_err(|_| Error::InvalidCiphertext)?;
    pos += x_size;
    let hat_h0 = Vector::decode(&ciphertext[pos..pos + h_size], params.lambda, params.q)
        .map_err(|_| Error::InvalidCiphertext)?;
    pos += h_size;
    let hat_h1 = Vector::decode(&ciphertext[pos..], params.lambda, params.q)
        .map_err(|_| Error::InvalidCiphertext)?;

    Ok((c0, c1, x, hat_h0, hat_h1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_vector_boundaries() {
        // q = 17, floor(q/2) = 8. Distances are circular; ties round to 0.
        let q = 17;
        let v = Vector::from_values(vec![0, 4, 5, 8, 12, 13, 16], q);
        let bits = round_vector(&v, q);
        assert_eq!(bits.values(), &[0, 0, 1, 1, 1, 0, 0]);
        assert_eq!(bits.modulus(), 2);
    }

    #[test]
    fn test_compute_hat_h_lifts_bits() {
        let q = 17;
        let uts = Vector::from_values(vec![1, 2, 16], q);
        let h = Vector::from_values(vec![1, 0, 1], 2);
        let hat = compute_hat_h(&uts, &h, q).unwrap();
        // floor(17/2) = 8: [1+8, 2, 16+8 mod 17]
        assert_eq!(hat.values(), &[9, 2, 7]);
        assert_eq!(hat.modulus(), q);
    }

    #[test]
    fn test_compute_hat_h_dimension_mismatch() {
        let q = 17;
        let uts = Vector::from_values(vec![1, 2], q);
        let h = Vector::from_values(vec![1], 2);
        assert_eq!(compute_hat_h(&uts, &h, q), Err(Error::InvalidDimensions));
    }

    #[test]
    fn test_xor_bytes_involution() {
        let a = vec![0xDE, 0xAD, 0xBE, 0xEF];
        let b = vec![0x01, 0x02, 0x03, 0x04];
        let x = xor_bytes(&a, &b);
        assert_eq!(xor_bytes(&x, &b), a);
    }

    #[test]
    fn test_hash3_depends_on_every_input() {
        let q = 97;
        let x = Vector::from_values(vec![1, 2, 3], q);
        let hat = Vector::from_values(vec![4, 5, 6], q);
        let h = Vector::from_values(vec![1, 0, 1], 2);

        let base = hash3(&x, &hat, &h).unwrap();
        assert_eq!(base, hash3(&x, &hat, &h).unwrap());

        let mut x2 = x.clone();
        x2.set(0, 2);
        assert_ne!(base, hash3(&x2, &hat, &h).unwrap());

        let mut h2 = h.clone();
        h2.set(0, 0);
        assert_ne!(base, hash3(&x, &hat, &h2).unwrap());
    }

    #[test]
    fn test_rounding_survives_small_noise() {
        // A bit scaled to floor(q/2) plus small noise must round back to
        // itself; noise near zero must round to zero.
        let q = 1152921504606830593u64;
        let half = q >> 1;
        let noisy_one = Vector::from_values(vec![half + 12345, half - 9876], q);
        assert_eq!(round_vector(&noisy_one, q).values(), &[1, 1]);

        let noisy_zero = Vector::from_values(vec![777, q - 777], q);
        assert_eq!(round_vector(&noisy_zero, q).values(), &[0, 0]);
    }
}
