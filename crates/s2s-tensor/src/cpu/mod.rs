use crate::backend::ComputeBackend;
use crate::error::{Result, TensorError};

/// Pure-Rust CPU compute backend.
///
/// Implements all operations with straightforward loops optimized for
/// correctness rather than peak performance. Intended as a reference
/// implementation and fallback.
#[derive(Debug, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn check_same_len(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(TensorError::ShapeMismatch {
            expected: vec![a.len()],
            got: vec![b.len()],
        });
    }
    Ok(())
}

fn check_chunks(op: &str, x: &[f32], n: usize) -> Result<()> {
    if n == 0 {
        return Err(TensorError::Other(format!("{}: chunk size must be > 0", op)));
    }
    if x.len() % n != 0 {
        return Err(TensorError::Other(format!(
            "{}: x.len()={} is not a multiple of {}",
            op,
            x.len(),
            n
        )));
    }
    Ok(())
}

/// Returns (max, sum of exp(x - max)) for one chunk.
fn max_and_exp_sum(chunk: &[f32]) -> (f32, f32) {
    let max_val = chunk.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let sum = chunk.iter().map(|v| (v - max_val).exp()).sum();
    (max_val, sum)
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn matmul(&self, a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Result<Vec<f32>> {
        if a.len() != m * k {
            return Err(TensorError::Other(format!(
                "matmul: a.len()={} but expected m*k={}",
                a.len(),
                m * k
            )));
        }
        if b.len() != k * n {
            return Err(TensorError::Other(format!(
                "matmul: b.len()={} but expected k*n={}",
                b.len(),
                k * n
            )));
        }

        // i-p-j order keeps the inner loop streaming over contiguous rows of b.
        let mut c = vec![0.0f32; m * n];
        for i in 0..m {
            let c_row = &mut c[i * n..(i + 1) * n];
            for p in 0..k {
                let a_ip = a[i * k + p];
                if a_ip == 0.0 {
                    continue;
                }
                let b_row = &b[p * n..(p + 1) * n];
                for (c_ij, b_pj) in c_row.iter_mut().zip(b_row) {
                    *c_ij += a_ip * b_pj;
                }
            }
        }
        Ok(c)
    }

    fn add(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
        check_same_len(a, b)?;
        Ok(a.iter().zip(b.iter()).map(|(x, y)| x + y).collect())
    }

    fn mul(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
        check_same_len(a, b)?;
        Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).collect())
    }

    fn add_bias(&self, x: &[f32], bias: &[f32], cols: usize) -> Result<Vec<f32>> {
        if bias.len() != cols {
            return Err(TensorError::ShapeMismatch {
                expected: vec![cols],
                got: vec![bias.len()],
            });
        }
        check_chunks("add_bias", x, cols)?;
        Ok(x
            .chunks(cols)
            .flat_map(|row| row.iter().zip(bias).map(|(v, b)| v + b))
            .collect())
    }

    fn tanh(&self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(x.iter().map(|v| v.tanh()).collect())
    }

    fn sigmoid(&self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(x.iter().map(|&v| 1.0 / (1.0 + (-v).exp())).collect())
    }

    fn softmax(&self, x: &[f32], n: usize) -> Result<Vec<f32>> {
        check_chunks("softmax", x, n)?;

        let mut result = Vec::with_capacity(x.len());
        for chunk in x.chunks(n) {
            let (max_val, sum) = max_and_exp_sum(chunk);
            result.extend(chunk.iter().map(|v| (v - max_val).exp() / sum));
        }
        Ok(result)
    }

    fn log_softmax(&self, x: &[f32], n: usize) -> Result<Vec<f32>> {
        check_chunks("log_softmax", x, n)?;

        let mut result = Vec::with_capacity(x.len());
        for chunk in x.chunks(n) {
            let (max_val, sum) = max_and_exp_sum(chunk);
            let log_z = max_val + sum.ln();
            result.extend(chunk.iter().map(|v| v - log_z));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn backend() -> CpuBackend {
        CpuBackend::new()
    }

    #[test]
    fn test_matmul_identity() {
        let b = backend();
        let a = vec![1.0, 0.0, 0.0, 1.0];
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let c = b.matmul(&a, &x, 2, 2, 2).unwrap();
        assert_eq!(c, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_matmul_rectangular() {
        let b = backend();
        // [1,2,3] @ [1,0;0,1;1,1] = [4,5]
        let c = b
            .matmul(&[1.0, 2.0, 3.0], &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0], 1, 3, 2)
            .unwrap();
        assert_eq!(c, vec![4.0, 5.0]);
    }

    #[test]
    fn test_matmul_bad_lengths() {
        let b = backend();
        assert!(b.matmul(&[1.0, 2.0], &[1.0], 1, 2, 1).is_err());
    }

    #[test]
    fn test_add_mul() {
        let b = backend();
        assert_eq!(b.add(&[1.0, 2.0], &[3.0, 4.0]).unwrap(), vec![4.0, 6.0]);
        assert_eq!(b.mul(&[2.0, 3.0], &[4.0, 5.0]).unwrap(), vec![8.0, 15.0]);
        assert!(b.add(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_add_bias_per_row() {
        let b = backend();
        let r = b.add_bias(&[1.0, 2.0, 3.0, 4.0], &[10.0, 20.0], 2).unwrap();
        assert_eq!(r, vec![11.0, 22.0, 13.0, 24.0]);
        assert!(b.add_bias(&[1.0, 2.0, 3.0], &[1.0, 1.0], 2).is_err());
    }

    #[test]
    fn test_sigmoid_tanh() {
        let b = backend();
        assert_abs_diff_eq!(b.sigmoid(&[0.0]).unwrap()[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(b.tanh(&[0.5]).unwrap()[0], 0.5f32.tanh(), epsilon = 1e-6);
    }

    #[test]
    fn test_softmax() {
        let b = backend();
        let r = b.softmax(&[1.0, 2.0, 3.0, 0.0, 0.0, 0.0], 3).unwrap();
        let sum: f32 = r[..3].iter().sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-6);
        assert!(r[0] < r[1] && r[1] < r[2]);
        assert_abs_diff_eq!(r[4], 1.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_log_softmax_matches_softmax() {
        let b = backend();
        let x = [0.5, -1.0, 2.0, 0.0];
        let p = b.softmax(&x, 4).unwrap();
        let lp = b.log_softmax(&x, 4).unwrap();
        for (p, lp) in p.iter().zip(&lp) {
            assert_abs_diff_eq!(p.ln(), *lp, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_softmax_zero_chunk() {
        assert!(backend().softmax(&[1.0], 0).is_err());
        assert!(backend().log_softmax(&[1.0, 2.0, 3.0], 2).is_err());
    }
}
