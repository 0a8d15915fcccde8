use crate::error::{Result, TensorError};
use std::fmt;

/// A tensor shape, wrapping a vector of dimension sizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Create a new shape from a vector of dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// Shape of a `rows x cols` matrix.
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Shape {
            dims: vec![rows, cols],
        }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements (product of all dimension sizes).
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the size of dimension `i`.
    ///
    /// # Panics
    /// Panics if `i >= ndim()`.
    pub fn dim(&self, i: usize) -> usize {
        self.dims[i]
    }

    /// Returns a reference to the underlying dimension sizes.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns `(rows, cols)` for a 2D shape.
    pub fn as_matrix(&self) -> Result<(usize, usize)> {
        match self.dims.as_slice() {
            [rows, cols] => Ok((*rows, *cols)),
            _ => Err(TensorError::NotAMatrix(self.dims.clone())),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl From<(usize, usize)> for Shape {
    fn from((rows, cols): (usize, usize)) -> Self {
        Shape::matrix(rows, cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_shape() {
        let s = Shape::matrix(2, 3);
        assert_eq!(s.ndim(), 2);
        assert_eq!(s.numel(), 6);
        assert_eq!(s.as_matrix().unwrap(), (2, 3));
    }

    #[test]
    fn test_as_matrix_rejects_other_ranks() {
        assert!(Shape::new(vec![4]).as_matrix().is_err());
        assert!(Shape::new(vec![2, 3, 4]).as_matrix().is_err());
    }

    #[test]
    fn test_empty_rows() {
        let s = Shape::matrix(0, 8);
        assert_eq!(s.numel(), 0);
        assert_eq!(s.as_matrix().unwrap(), (0, 8));
    }

    #[test]
    fn test_display() {
        assert_eq!(Shape::matrix(2, 5).to_string(), "[2, 5]");
    }
}
