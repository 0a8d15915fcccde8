use std::fmt::Debug;

use crate::error::Result;

/// Trait for pluggable compute backends (CPU, GPU, etc.).
///
/// All operations work on row-major f32 slices. Data is passed in as slices
/// and returned as owned vectors. One backend instance may be shared by
/// every scorer on a device, so implementations must be `Send + Sync`.
pub trait ComputeBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "cpu").
    fn name(&self) -> &str;

    /// Matrix multiplication: C = A @ B.
    ///
    /// - `a`: row-major data of shape [m, k]
    /// - `b`: row-major data of shape [k, n]
    /// - Returns: row-major data of shape [m, n]
    fn matmul(&self, a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Result<Vec<f32>>;

    /// Element-wise addition: result[i] = a[i] + b[i].
    fn add(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>>;

    /// Element-wise multiplication: result[i] = a[i] * b[i].
    fn mul(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>>;

    /// Adds `bias` (length `cols`) to every row of `x`.
    fn add_bias(&self, x: &[f32], bias: &[f32], cols: usize) -> Result<Vec<f32>>;

    /// Hyperbolic tangent, element-wise.
    fn tanh(&self, x: &[f32]) -> Result<Vec<f32>>;

    /// Logistic sigmoid, element-wise: 1 / (1 + exp(-x)).
    fn sigmoid(&self, x: &[f32]) -> Result<Vec<f32>>;

    /// Softmax over chunks of `n` elements.
    ///
    /// For each chunk: result[i] = exp(x[i] - max(x)) / sum(exp(x[j] - max(x)))
    fn softmax(&self, x: &[f32], n: usize) -> Result<Vec<f32>>;

    /// Log-softmax over chunks of `n` elements.
    ///
    /// For each chunk: result[i] = x[i] - max(x) - ln(sum(exp(x[j] - max(x))))
    fn log_softmax(&self, x: &[f32], n: usize) -> Result<Vec<f32>>;
}
