//! Row-major matrices over Z_q.

use byteorder::{BigEndian, ByteOrder};
use rand::Rng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::vector::{add_mod, element_size, mul_mod, Vector};
use crate::error::{Error, Result};

/// Matrix of finite-field elements, stored row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    values: Vec<u64>,
    modulus: u64,
}

impl Matrix {
    /// Create a zero matrix with the given dimensions.
    pub fn new(rows: usize, cols: usize, modulus: u64) -> Self {
        Self {
            rows,
            cols,
            values: vec![0; rows * cols],
            modulus,
        }
    }

    /// Create a matrix with uniformly random elements in `[0, q)`.
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, modulus: u64, rng: &mut R) -> Self {
        let values = (0..rows * cols).map(|_| rng.gen_range(0..modulus)).collect();
        Self {
            rows,
            cols,
            values,
            modulus,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The modulus q.
    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// Element at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> u64 {
        self.values[row * self.cols + col]
    }

    /// Store `value mod q` at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: u64) {
        self.values[row * self.cols + col] = value % self.modulus;
    }

    /// The transposed matrix.
    pub fn transpose(&self) -> Self {
        let mut values = vec![0u64; self.rows * self.cols];
        for i in 0..self.rows {
            for j in 0..self.cols {
                values[j * self.rows + i] = self.values[i * self.cols + j];
            }
        }
        Self {
            rows: self.cols,
            cols: self.rows,
            values,
            modulus: self.modulus,
        }
    }

    /// Matrix product mod q.
    pub fn multiply(&self, other: &Self) -> Result<Self> {
        if self.cols != other.rows {
            return Err(Error::InvalidDimensions);
        }
        let q = self.modulus;
        let mut result = Self::new(self.rows, other.cols, q);
        for i in 0..self.rows {
            for j in 0..other.cols {
                let mut acc = 0u64;
                for k in 0..self.cols {
                    acc = add_mod(acc, mul_mod(self.get(i, k), other.get(k, j), q), q);
                }
                result.values[i * other.cols + j] = acc;
            }
        }
        Ok(result)
    }

    /// Matrix-vector product mod q.
    pub fn multiply_vector(&self, v: &Vector) -> Result<Vector> {
        if self.cols != v.len() {
            return Err(Error::InvalidDimensions);
        }
        let q = self.modulus;
        let mut result = Vector::new(self.rows, q);
        for i in 0..self.rows {
            let mut acc = 0u64;
            for (j, &x) in v.values().iter().enumerate() {
                acc = add_mod(acc, mul_mod(self.values[i * self.cols + j], x, q), q);
            }
            result.set(i, acc);
        }
        Ok(result)
    }

    /// Size in bytes of the encoded form: two 4-byte dimensions plus
    /// `rows * cols * element_size(q)` element bytes.
    pub fn encoded_size(rows: usize, cols: usize, modulus: u64) -> usize {
        8 + rows * cols * element_size(modulus)
    }

    /// Encode as 4-byte big-endian rows, 4-byte big-endian cols, then
    /// row-major fixed-width big-endian elements.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let el_size = element_size(self.modulus);
        let mut buf = vec![0u8; Self::encoded_size(self.rows, self.cols, self.modulus)];
        BigEndian::write_u32(&mut buf[..4], self.rows as u32);
        BigEndian::write_u32(&mut buf[4..8], self.cols as u32);
        for (i, &v) in self.values.iter().enumerate() {
            if el_size < 8 && (v >> (8 * el_size)) != 0 {
                return Err(Error::Serialization("element too large"));
            }
            let offset = 8 + i * el_size;
            BigEndian::write_uint(&mut buf[offset..offset + el_size], v, el_size);
        }
        Ok(buf)
    }

    /// Decode a matrix with the expected dimensions over `modulus`.
    ///
    /// Raw elements are reduced mod q on the way in; the declared dimensions
    /// must match the expected ones and the buffer must hold every element.
    pub fn decode(data: &[u8], expected_rows: usize, expected_cols: usize, modulus: u64) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::Deserialization("matrix data too short"));
        }
        let rows = BigEndian::read_u32(&data[..4]) as usize;
        let cols = BigEndian::read_u32(&data[4..8]) as usize;
        if rows != expected_rows || cols != expected_cols {
            return Err(Error::Deserialization("matrix dimension prefix mismatch"));
        }
        let el_size = element_size(modulus);
        if data.len() < 8 + rows * cols * el_size {
            return Err(Error::Deserialization("matrix data shorter than declared"));
        }
        let mut values = Vec::with_capacity(rows * cols);
        for i in 0..rows * cols {
            let offset = 8 + i * el_size;
            let raw = BigEndian::read_uint(&data[offset..offset + el_size], el_size);
            values.push(raw % modulus);
        }
        Ok(Self {
            rows,
            cols,
            values,
            modulus,
        })
    }
}

impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self.modulus == other.modulus
            && self.values == other.values
    }
}

impl Eq for Matrix {}

impl Zeroize for Matrix {
    fn zeroize(&mut self) {
        self.values.zeroize();
    }
}
