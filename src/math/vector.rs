//! Length-explicit vectors over Z_q.
//!
//! Every stored element lies in `[0, q)`; arithmetic reduces after each
//! addition or multiplication. Elements are `u64` with `u128` intermediates,
//! which is exact for any 64-bit modulus.

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of significant bits in `x`.
#[inline]
pub(crate) fn bit_len(x: u64) -> usize {
    (64 - x.leading_zeros()) as usize
}

/// Bytes needed to hold one element of Z_q: `ceil(bitlen(q) / 8)`.
#[inline]
pub(crate) fn element_size(modulus: u64) -> usize {
    (bit_len(modulus) + 7) / 8
}

#[inline]
pub(crate) fn add_mod(a: u64, b: u64, q: u64) -> u64 {
    ((a as u128 + b as u128) % q as u128) as u64
}

#[inline]
pub(crate) fn sub_mod(a: u64, b: u64, q: u64) -> u64 {
    if a >= b {
        a - b
    } else {
        q - b + a
    }
}

#[inline]
pub(crate) fn mul_mod(a: u64, b: u64, q: u64) -> u64 {
    ((a as u128 * b as u128) % q as u128) as u64
}

/// Vector of finite-field elements with an explicit modulus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vector {
    values: Vec<u64>,
    modulus: u64,
}

impl Vector {
    /// Create a zero vector of the given length.
    pub fn new(length: usize, modulus: u64) -> Self {
        Self {
            values: vec![0; length],
            modulus,
        }
    }

    /// Create a vector from raw values, reducing each mod `modulus`.
    pub fn from_values(values: Vec<u64>, modulus: u64) -> Self {
        let values = values.into_iter().map(|v| v % modulus).collect();
        Self { values, modulus }
    }

    /// Vector length.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector has zero length.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The modulus q.
    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// Rebind the modulus without reducing stored values.
    ///
    /// Used after seed expansion, where the packed `s` entries are small
    /// bit-masked integers that the caller lifts into Z_q.
    pub fn set_modulus(&mut self, modulus: u64) {
        self.modulus = modulus;
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> u64 {
        self.values[index]
    }

    /// Store `value mod q` at `index`.
    pub fn set(&mut self, index: usize, value: u64) {
        self.values[index] = value % self.modulus;
    }

    /// The underlying element slice.
    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// Componentwise sum mod q.
    pub fn add(&self, other: &Self) -> Result<Self> {
        if self.len() != other.len() {
            return Err(Error::InvalidDimensions);
        }
        let q = self.modulus;
        let values = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(&a, &b)| add_mod(a, b, q))
            .collect();
        Ok(Self { values, modulus: q })
    }

    /// Componentwise difference mod q.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        if self.len() != other.len() {
            return Err(Error::InvalidDimensions);
        }
        let q = self.modulus;
        let values = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(&a, &b)| sub_mod(a, b, q))
            .collect();
        Ok(Self { values, modulus: q })
    }

    /// Multiply every element by `scalar` mod q.
    pub fn scalar_mul(&self, scalar: u64) -> Self {
        let q = self.modulus;
        let scalar = scalar % q;
        let values = self.values.iter().map(|&v| mul_mod(v, scalar, q)).collect();
        Self { values, modulus: q }
    }

    /// Inner product mod q.
    pub fn dot(&self, other: &Self) -> Result<u64> {
        if self.len() != other.len() {
            return Err(Error::InvalidDimensions);
        }
        let q = self.modulus;
        let mut acc = 0u64;
        for (&a, &b) in self.values.iter().zip(other.values.iter()) {
            acc = add_mod(acc, mul_mod(a, b, q), q);
        }
        Ok(acc)
    }

    /// Sum of all elements mod q.
    pub fn sum(&self) -> u64 {
        let q = self.modulus;
        self.values.iter().fold(0u64, |acc, &v| add_mod(acc, v, q))
    }

    /// Size in bytes of the encoded form: 4-byte length prefix plus
    /// `len * element_size(q)` element bytes.
    pub fn encoded_size(length: usize, modulus: u64) -> usize {
        4 + length * element_size(modulus)
    }

    /// Encode as a 4-byte big-endian length followed by fixed-width
    /// big-endian elements, zero-left-padded.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let el_size = element_size(self.modulus);
        let mut buf = vec![0u8; Self::encoded_size(self.len(), self.modulus)];
        BigEndian::write_u32(&mut buf[..4], self.len() as u32);
        for (i, &v) in self.values.iter().enumerate() {
            if el_size < 8 && (v >> (8 * el_size)) != 0 {
                return Err(Error::Serialization("element too large"));
            }
            let offset = 4 + i * el_size;
            BigEndian::write_uint(&mut buf[offset..offset + el_size], v, el_size);
        }
        Ok(buf)
    }

    /// Decode a vector of `expected_len` elements over `modulus`.
    ///
    /// Raw big-endian elements are reduced mod q on the way in. Fails when
    /// the buffer is shorter than the declared content or the declared
    /// length disagrees with `expected_len`.
    pub fn decode(data: &[u8], expected_len: usize, modulus: u64) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::Deserialization("vector data too short"));
        }
        let length = BigEndian::read_u32(&data[..4]) as usize;
        if length != expected_len {
            return Err(Error::Deserialization("vector length prefix mismatch"));
        }
        let el_size = element_size(modulus);
        if data.len() < 4 + length * el_size {
            return Err(Error::Deserialization("vector data shorter than declared"));
        }
        let mut values = Vec::with_capacity(length);
        for i in 0..length {
            let offset = 4 + i * el_size;
            let raw = BigEndian::read_uint(&data[offset..offset + el_size], el_size);
            values.push(raw % modulus);
        }
        Ok(Self { values, modulus })
    }
}

impl PartialEq for Vector {
    fn eq(&self, other: &Self) -> bool {
        self.modulus == other.modulus && self.values == other.values
    }
}

impl Eq for Vector {}
