use std::mem::size_of;

/// Exclusive upper bound for image identifiers (`2^31`).
pub const IMAGE_ID_LIMIT: u32 = 1 << 31;

/// Exclusive upper bound for pair identifiers (`2^62`).
pub const PAIR_ID_LIMIT: u64 = 1 << 62;

/// Error types for the record codec.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    /// The identifier is outside of its documented domain.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(u64),

    /// The payload length does not match the declared shape.
    #[error("Corrupt record: a {rows}x{cols} matrix needs {expected} bytes, got {actual}")]
    CorruptRecord {
        /// Declared number of rows.
        rows: u32,
        /// Declared number of columns.
        cols: u32,
        /// Expected payload length in bytes.
        expected: usize,
        /// Actual payload length in bytes.
        actual: usize,
    },

    /// The number of elements does not match the requested shape.
    #[error("Shape mismatch: {rows}x{cols} matrix cannot hold {len} elements")]
    ShapeMismatch {
        /// Requested number of rows.
        rows: u32,
        /// Requested number of columns.
        cols: u32,
        /// Number of elements provided.
        len: usize,
    },
}

mod private {
    pub trait Sealed {}
    impl Sealed for f64 {}
    impl Sealed for f32 {}
    impl Sealed for u32 {}
    impl Sealed for i32 {}
    impl Sealed for u8 {}
}

/// Numeric element types that can be stored in a record blob.
///
/// The element type of a blob is fixed by the table it lives in and is never
/// inferred from the payload itself.
pub trait BlobElement: bytemuck::Pod + private::Sealed + std::fmt::Debug {}

impl BlobElement for f64 {}
impl BlobElement for f32 {}
impl BlobElement for u32 {}
impl BlobElement for i32 {}
impl BlobElement for u8 {}

/// A dense row-major 2D matrix decoded from a record blob.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    rows: u32,
    cols: u32,
    data: Vec<T>,
}

impl<T: BlobElement> Matrix<T> {
    /// Create a matrix from a row-major vector.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ShapeMismatch`] if `data.len() != rows * cols`.
    pub fn from_shape_vec(rows: u32, cols: u32, data: Vec<T>) -> Result<Self, CodecError> {
        if data.len() != rows as usize * cols as usize {
            return Err(CodecError::ShapeMismatch {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Create a matrix from fixed-width rows.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ShapeMismatch`] if the row or column count does
    /// not fit in a `u32`.
    pub fn from_rows<const C: usize>(rows: &[[T; C]]) -> Result<Self, CodecError> {
        let mismatch = || CodecError::ShapeMismatch {
            rows: u32::try_from(rows.len()).unwrap_or(u32::MAX),
            cols: u32::try_from(C).unwrap_or(u32::MAX),
            len: rows.len().saturating_mul(C),
        };
        let num_rows = u32::try_from(rows.len()).map_err(|_| mismatch())?;
        let num_cols = u32::try_from(C).map_err(|_| mismatch())?;
        Ok(Self {
            rows: num_rows,
            cols: num_cols,
            data: rows.iter().flatten().copied().collect(),
        })
    }

    /// Number of rows.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// The elements in row-major order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consume the matrix and return its row-major elements.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Borrow the `i`-th row, if it exists.
    pub fn row(&self, i: u32) -> Option<&[T]> {
        if i >= self.rows {
            return None;
        }
        let cols = self.cols as usize;
        let start = i as usize * cols;
        Some(&self.data[start..start + cols])
    }

    /// Return a copy with the column order reversed.
    pub fn reverse_columns(&self) -> Self {
        let cols = self.cols as usize;
        let data = if cols == 0 {
            Vec::new()
        } else {
            self.data
                .chunks_exact(cols)
                .flat_map(|row| row.iter().rev().copied())
                .collect()
        };
        Self {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }
}

/// A shaped opaque record as stored on disk: `(rows, cols, payload)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixBlob {
    /// Number of rows.
    pub rows: u32,
    /// Number of columns.
    pub cols: u32,
    /// Raw row-major payload.
    pub data: Vec<u8>,
}

impl MatrixBlob {
    /// Decode the payload with the table's element type.
    pub fn decode<T: BlobElement>(&self) -> Result<Matrix<T>, CodecError> {
        decode_matrix(&self.data, self.rows, self.cols)
    }
}

/// Serialize a matrix to its raw row-major byte representation.
pub fn encode_matrix<T: BlobElement>(matrix: &Matrix<T>) -> MatrixBlob {
    MatrixBlob {
        rows: matrix.rows,
        cols: matrix.cols,
        data: bytemuck::cast_slice(matrix.data.as_slice()).to_vec(),
    }
}

/// Deserialize a raw payload into a `rows x cols` matrix of `T`.
///
/// # Errors
///
/// Returns [`CodecError::CorruptRecord`] if the payload length is not
/// exactly `rows * cols * size_of::<T>()`.
pub fn decode_matrix<T: BlobElement>(
    bytes: &[u8],
    rows: u32,
    cols: u32,
) -> Result<Matrix<T>, CodecError> {
    let expected = rows as usize * cols as usize * size_of::<T>();
    if bytes.len() != expected {
        return Err(CodecError::CorruptRecord {
            rows,
            cols,
            expected,
            actual: bytes.len(),
        });
    }

    // the payload may not be aligned for T, so collect into a fresh buffer
    let data: Vec<T> = bytemuck::pod_collect_to_vec(bytes);

    Ok(Matrix { rows, cols, data })
}

/// Combine two image identifiers into a single order-independent key.
///
/// The key is `min(a, b) * 2^31 + max(a, b)`.
///
/// # Example
///
/// ```
/// use viewprep_db::codec::{pair_id, unpair_id};
///
/// let key = pair_id(7, 3).unwrap();
/// assert_eq!(key, pair_id(3, 7).unwrap());
/// assert_eq!(unpair_id(key).unwrap(), (3, 7));
/// ```
pub fn pair_id(id_a: u32, id_b: u32) -> Result<u64, CodecError> {
    for id in [id_a, id_b] {
        if id >= IMAGE_ID_LIMIT {
            return Err(CodecError::InvalidIdentifier(id as u64));
        }
    }
    let (lo, hi) = if id_a <= id_b {
        (id_a, id_b)
    } else {
        (id_b, id_a)
    };
    Ok(lo as u64 * IMAGE_ID_LIMIT as u64 + hi as u64)
}

/// Split a pair key back into its `(smaller, larger)` image identifiers.
pub fn unpair_id(key: u64) -> Result<(u32, u32), CodecError> {
    if key >= PAIR_ID_LIMIT {
        return Err(CodecError::InvalidIdentifier(key));
    }
    let lo = (key / IMAGE_ID_LIMIT as u64) as u32;
    let hi = (key % IMAGE_ID_LIMIT as u64) as u32;

    // keys produced by pair_id always have lo <= hi
    if lo > hi {
        return Err(CodecError::InvalidIdentifier(key));
    }
    Ok((lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_f32() -> Result<(), CodecError> {
        let m = Matrix::from_shape_vec(2, 3, vec![1.5f32, -2.0, 3.25, 0.0, f32::MAX, 1e-7])?;
        let blob = encode_matrix(&m);
        assert_eq!(blob.data.len(), 24);
        assert_eq!(blob.decode::<f32>()?, m);
        Ok(())
    }

    #[test]
    fn test_roundtrip_f64_and_u32() -> Result<(), CodecError> {
        let f = Matrix::from_rows(&[[1.0f64, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])?;
        assert_eq!(encode_matrix(&f).decode::<f64>()?, f);

        let m = Matrix::from_rows(&[[0u32, 4], [1, 9], [u32::MAX, 2]])?;
        let blob = encode_matrix(&m);
        assert_eq!((blob.rows, blob.cols), (3, 2));
        assert_eq!(decode_matrix::<u32>(&blob.data, 3, 2)?, m);
        Ok(())
    }

    #[test]
    fn test_empty_matrix() -> Result<(), CodecError> {
        let m = Matrix::<f32>::from_shape_vec(0, 128, vec![])?;
        let blob = encode_matrix(&m);
        assert!(blob.data.is_empty());
        assert_eq!(blob.decode::<f32>()?.rows(), 0);
        Ok(())
    }

    #[test]
    fn test_decode_corrupt() {
        let err = decode_matrix::<f32>(&[0u8; 7], 1, 2).unwrap_err();
        assert_eq!(
            err,
            CodecError::CorruptRecord {
                rows: 1,
                cols: 2,
                expected: 8,
                actual: 7
            }
        );
        // element type is taken from the caller, not the payload
        assert!(decode_matrix::<f64>(&[0u8; 8], 1, 2).is_err());
    }

    #[test]
    fn test_shape_mismatch() {
        let err = Matrix::from_shape_vec(2, 2, vec![1u8, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            CodecError::ShapeMismatch {
                rows: 2,
                cols: 2,
                len: 3
            }
        );
    }

    #[test]
    fn test_reverse_columns() -> Result<(), CodecError> {
        let m = Matrix::from_rows(&[[1u32, 2], [3, 4]])?;
        assert_eq!(m.reverse_columns(), Matrix::from_rows(&[[2u32, 1], [4, 3]])?);
        assert_eq!(m.row(1), Some(&[3u32, 4][..]));
        assert_eq!(m.row(2), None);
        Ok(())
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_from_rows_too_many_rows() {
        // zero-width rows take no memory, so the row count alone overflows
        let rows = vec![[0u8; 0]; u32::MAX as usize + 1];
        assert_eq!(
            Matrix::from_rows(rows.as_slice()).unwrap_err(),
            CodecError::ShapeMismatch {
                rows: u32::MAX,
                cols: 0,
                len: 0
            }
        );
    }

    #[test]
    fn test_pair_id() -> Result<(), CodecError> {
        assert_eq!(pair_id(0, 1)?, 1);
        assert_eq!(pair_id(1, 2)?, (1u64 << 31) + 2);
        let max = IMAGE_ID_LIMIT - 1;
        for (a, b) in [(1, 2), (2, 1), (0, max), (max, max - 1), (12345, 54321)] {
            let key = pair_id(a, b)?;
            assert_eq!(key, pair_id(b, a)?);
            let (lo, hi) = unpair_id(key)?;
            assert_eq!((lo, hi), (a.min(b), a.max(b)));
        }
        Ok(())
    }

    #[test]
    fn test_pair_id_out_of_domain() {
        assert_eq!(
            pair_id(IMAGE_ID_LIMIT, 0),
            Err(CodecError::InvalidIdentifier(IMAGE_ID_LIMIT as u64))
        );
        assert_eq!(
            unpair_id(PAIR_ID_LIMIT),
            Err(CodecError::InvalidIdentifier(PAIR_ID_LIMIT))
        );
        // lo > hi can never come out of pair_id
        let bogus = 5u64 * IMAGE_ID_LIMIT as u64 + 2;
        assert!(unpair_id(bogus).is_err());
    }
}
