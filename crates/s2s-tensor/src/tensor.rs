use crate::backend::ComputeBackend;
use crate::error::{Result, TensorError};
use crate::shape::Shape;

/// A dense tensor of contiguous, row-major f32 data.
///
/// Almost everything in the decoder is a matrix where each row belongs to
/// one hypothesis or one source position, so the row helpers below assume
/// a 2D shape. Computation is dispatched to a `ComputeBackend`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f32>,
    shape: Shape,
}

impl Tensor {
    /// Create a new tensor from f32 data and a shape.
    ///
    /// # Panics
    /// Panics if `data.len() != shape.numel()`.
    pub fn new(data: Vec<f32>, shape: Shape) -> Self {
        assert_eq!(
            data.len(),
            shape.numel(),
            "data length {} does not match shape {:?} (numel={})",
            data.len(),
            shape,
            shape.numel()
        );
        Tensor { data, shape }
    }

    /// Create a `rows x cols` matrix, checking the data length.
    pub fn from_vec(data: Vec<f32>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(TensorError::ShapeMismatch {
                expected: vec![rows, cols],
                got: vec![data.len()],
            });
        }
        Ok(Tensor {
            data,
            shape: Shape::matrix(rows, cols),
        })
    }

    /// Stack equally sized rows into a matrix.
    pub fn from_rows(rows: &[Vec<f32>], cols: usize) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(TensorError::ShapeMismatch {
                    expected: vec![cols],
                    got: vec![row.len()],
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Tensor {
            data,
            shape: Shape::matrix(rows.len(), cols),
        })
    }

    /// Create a zero-filled tensor with the given shape.
    pub fn zeros(shape: Shape) -> Self {
        let n = shape.numel();
        Tensor {
            data: vec![0.0; n],
            shape,
        }
    }

    /// Returns a reference to the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Number of rows (the leading dimension, 1 for scalars).
    pub fn rows(&self) -> usize {
        self.shape.dims().first().copied().unwrap_or(1)
    }

    /// Number of elements in one row.
    pub fn cols(&self) -> usize {
        self.shape.dims().iter().skip(1).product()
    }

    /// Returns true if the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the underlying data as an f32 slice.
    pub fn data_f32(&self) -> &[f32] {
        &self.data
    }

    /// Returns row `i`.
    ///
    /// # Panics
    /// Panics if `i >= rows()`.
    pub fn row(&self, i: usize) -> &[f32] {
        let cols = self.cols();
        &self.data[i * cols..(i + 1) * cols]
    }

    /// Matrix multiplication of two 2D tensors using the given backend.
    ///
    /// self is [m, k], other is [k, n], result is [m, n].
    pub fn matmul(&self, other: &Tensor, backend: &dyn ComputeBackend) -> Result<Tensor> {
        let (m, k) = self.shape.as_matrix()?;
        let (k2, n) = other.shape.as_matrix()?;

        if k != k2 {
            return Err(TensorError::MatmulMismatch { m, k, k2, n });
        }

        let result_data = backend.matmul(&self.data, &other.data, m, k, n)?;
        Tensor::from_vec(result_data, m, n)
    }

    /// Build a new matrix whose row `i` is a copy of `self.row(indices[i])`.
    ///
    /// Rows may be repeated or dropped; the output has `indices.len()` rows.
    pub fn gather_rows(&self, indices: &[usize]) -> Result<Tensor> {
        let (rows, cols) = self.shape.as_matrix()?;
        let mut data = Vec::with_capacity(indices.len() * cols);
        for &index in indices {
            if index >= rows {
                return Err(TensorError::RowOutOfRange { index, rows });
            }
            data.extend_from_slice(self.row(index));
        }
        Tensor::from_vec(data, indices.len(), cols)
    }

    /// Build a new matrix keeping only the listed columns, in the given order.
    pub fn select_columns(&self, indices: &[usize]) -> Result<Tensor> {
        let (rows, cols) = self.shape.as_matrix()?;
        if let Some(&index) = indices.iter().find(|&&c| c >= cols) {
            return Err(TensorError::ColumnOutOfRange { index, cols });
        }
        let mut data = Vec::with_capacity(rows * indices.len());
        for r in 0..rows {
            let row = self.row(r);
            data.extend(indices.iter().map(|&c| row[c]));
        }
        Tensor::from_vec(data, rows, indices.len())
    }

    /// Concatenate two matrices with the same row count side by side.
    pub fn concat_cols(&self, other: &Tensor) -> Result<Tensor> {
        let (rows, a_cols) = self.shape.as_matrix()?;
        let (other_rows, b_cols) = other.shape.as_matrix()?;
        if rows != other_rows {
            return Err(TensorError::ShapeMismatch {
                expected: vec![rows, b_cols],
                got: vec![other_rows, b_cols],
            });
        }
        let mut data = Vec::with_capacity(rows * (a_cols + b_cols));
        for r in 0..rows {
            data.extend_from_slice(self.row(r));
            data.extend_from_slice(other.row(r));
        }
        Tensor::from_vec(data, rows, a_cols + b_cols)
    }

    /// Average of all rows, as a `1 x cols` matrix.
    pub fn mean_rows(&self) -> Result<Tensor> {
        let (rows, cols) = self.shape.as_matrix()?;
        if rows == 0 {
            return Err(TensorError::Other("mean over zero rows".to_string()));
        }
        let mut mean = vec![0.0f32; cols];
        for r in 0..rows {
            for (m, v) in mean.iter_mut().zip(self.row(r)) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= rows as f32;
        }
        Tensor::from_vec(mean, 1, cols)
    }

    /// Repeat a `1 x cols` matrix `n` times.
    pub fn broadcast_rows(&self, n: usize) -> Result<Tensor> {
        let (rows, cols) = self.shape.as_matrix()?;
        if rows != 1 {
            return Err(TensorError::ShapeMismatch {
                expected: vec![1, cols],
                got: vec![rows, cols],
            });
        }
        Tensor::from_vec(self.data.repeat(n), n, cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuBackend;

    fn sample() -> Tensor {
        Tensor::new(
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            Shape::matrix(3, 2),
        )
    }

    #[test]
    fn test_new_tensor() {
        let t = sample();
        assert_eq!(t.rows(), 3);
        assert_eq!(t.cols(), 2);
        assert_eq!(t.row(1), &[3.0, 4.0]);
    }

    #[test]
    #[should_panic]
    fn test_new_shape_mismatch_panics() {
        let _t = Tensor::new(vec![1.0, 2.0], Shape::new(vec![3]));
    }

    #[test]
    fn test_from_rows_checks_width() {
        assert!(Tensor::from_rows(&[vec![1.0, 2.0], vec![3.0]], 2).is_err());
        let t = Tensor::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]], 2).unwrap();
        assert_eq!(t.shape().dims(), &[2, 2]);
    }

    #[test]
    fn test_matmul() {
        let backend = CpuBackend::new();
        let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], Shape::matrix(2, 2));
        let b = Tensor::new(vec![5.0, 6.0, 7.0, 8.0], Shape::matrix(2, 2));
        let c = a.matmul(&b, &backend).unwrap();
        assert_eq!(c.data_f32(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_dimension_mismatch() {
        let backend = CpuBackend::new();
        let a = Tensor::new(vec![1.0, 2.0, 3.0], Shape::matrix(1, 3));
        let b = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], Shape::matrix(2, 2));
        assert!(a.matmul(&b, &backend).is_err());
    }

    #[test]
    fn test_gather_rows_duplicates_and_reorders() {
        let t = sample();
        let g = t.gather_rows(&[2, 0, 0]).unwrap();
        assert_eq!(g.rows(), 3);
        assert_eq!(g.row(0), &[5.0, 6.0]);
        assert_eq!(g.row(1), &[1.0, 2.0]);
        assert_eq!(g.row(2), &[1.0, 2.0]);
    }

    #[test]
    fn test_gather_rows_out_of_range() {
        let err = sample().gather_rows(&[3]).unwrap_err();
        assert!(matches!(err, TensorError::RowOutOfRange { index: 3, rows: 3 }));
    }

    #[test]
    fn test_select_columns() {
        let t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], Shape::matrix(2, 3));
        let s = t.select_columns(&[2, 0]).unwrap();
        assert_eq!(s.data_f32(), &[3.0, 1.0, 6.0, 4.0]);
        assert!(t.select_columns(&[3]).is_err());
    }

    #[test]
    fn test_concat_and_mean() {
        let a = Tensor::new(vec![1.0, 3.0], Shape::matrix(2, 1));
        let b = Tensor::new(vec![2.0, 4.0], Shape::matrix(2, 1));
        let c = a.concat_cols(&b).unwrap();
        assert_eq!(c.data_f32(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(c.mean_rows().unwrap().data_f32(), &[2.0, 3.0]);
    }

    #[test]
    fn test_broadcast_rows() {
        let t = Tensor::new(vec![1.0, 2.0], Shape::matrix(1, 2));
        let b = t.broadcast_rows(3).unwrap();
        assert_eq!(b.rows(), 3);
        assert_eq!(b.row(2), &[1.0, 2.0]);
        assert!(sample().broadcast_rows(2).is_err());
    }
}
