use thiserror::Error;

#[derive(Error, Debug)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },
    #[error("operation requires a 2D tensor, got shape {0:?}")]
    NotAMatrix(Vec<usize>),
    #[error("row index {index} out of range for {rows} rows")]
    RowOutOfRange { index: usize, rows: usize },
    #[error("column index {index} out of range for {cols} columns")]
    ColumnOutOfRange { index: usize, cols: usize },
    #[error("matmul dimension mismatch: [{m}x{k}] @ [{k2}x{n}]")]
    MatmulMismatch {
        m: usize,
        k: usize,
        k2: usize,
        n: usize,
    },
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TensorError>;
