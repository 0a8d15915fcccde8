use s2s_tensor::{ComputeBackend, Tensor, TensorError};

use crate::error::Result;
use super::weights::ParamSource;

/// Parameters of one gated recurrent unit.
///
/// Gate weights (`w`, `u`, `b`) produce the reset and update gates side by
/// side: columns `0..hidden` are the reset gate, `hidden..2*hidden` the
/// update gate. Biases are stored as `1 x n` matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct GruWeights {
    /// Input to gates, [input, 2*hidden].
    pub w: Tensor,
    /// Gate bias, [1, 2*hidden].
    pub b: Tensor,
    /// Recurrent state to gates, [hidden, 2*hidden].
    pub u: Tensor,
    /// Input to candidate state, [input, hidden].
    pub wx: Tensor,
    /// Candidate bias, [1, hidden].
    pub bx: Tensor,
    /// Recurrent state to candidate state, [hidden, hidden].
    pub ux: Tensor,
}

impl GruWeights {
    pub(crate) fn build(
        source: &mut dyn ParamSource,
        prefix: &str,
        input_dim: usize,
        hidden_dim: usize,
    ) -> Result<GruWeights> {
        let h = hidden_dim;
        Ok(GruWeights {
            w: source.param(&format!("{}.w", prefix), input_dim, 2 * h)?,
            b: source.param(&format!("{}.b", prefix), 1, 2 * h)?,
            u: source.param(&format!("{}.u", prefix), h, 2 * h)?,
            wx: source.param(&format!("{}.wx", prefix), input_dim, h)?,
            bx: source.param(&format!("{}.bx", prefix), 1, h)?,
            ux: source.param(&format!("{}.ux", prefix), h, h)?,
        })
    }

    pub(crate) fn visit(&self, prefix: &str, f: &mut dyn FnMut(&str, &Tensor)) {
        f(&format!("{}.w", prefix), &self.w);
        f(&format!("{}.b", prefix), &self.b);
        f(&format!("{}.u", prefix), &self.u);
        f(&format!("{}.wx", prefix), &self.wx);
        f(&format!("{}.bx", prefix), &self.bx);
        f(&format!("{}.ux", prefix), &self.ux);
    }

    pub fn input_dim(&self) -> usize {
        self.w.rows()
    }

    pub fn hidden_dim(&self) -> usize {
        self.ux.rows()
    }

    /// Advance every row of `h` by one step on the matching row of `x`.
    ///
    /// ```text
    /// [r, u] = sigmoid(x W + b + h U)
    /// c      = tanh(x Wx + bx + r * (h Ux))
    /// h'     = u * h + (1 - u) * c
    /// ```
    pub fn step(&self, x: &Tensor, h: &Tensor, backend: &dyn ComputeBackend) -> Result<Tensor> {
        let n = x.rows();
        let hd = self.hidden_dim();
        if h.rows() != n || h.cols() != hd {
            return Err(TensorError::ShapeMismatch {
                expected: vec![n, hd],
                got: h.shape().dims().to_vec(),
            }
            .into());
        }

        let xw = x.matmul(&self.w, backend)?;
        let hu = h.matmul(&self.u, backend)?;
        let pre = backend.add(xw.data_f32(), hu.data_f32())?;
        let pre = backend.add_bias(&pre, self.b.data_f32(), 2 * hd)?;
        let gates = backend.sigmoid(&pre)?;

        let mut reset = Vec::with_capacity(n * hd);
        let mut update = Vec::with_capacity(n * hd);
        for row in gates.chunks(2 * hd) {
            reset.extend_from_slice(&row[..hd]);
            update.extend_from_slice(&row[hd..]);
        }

        let xx = x.matmul(&self.wx, backend)?;
        let xx = backend.add_bias(xx.data_f32(), self.bx.data_f32(), hd)?;
        let hx = h.matmul(&self.ux, backend)?;
        let gated = backend.mul(&reset, hx.data_f32())?;
        let candidate = backend.tanh(&backend.add(&xx, &gated)?)?;

        let next = update
            .iter()
            .zip(h.data_f32())
            .zip(&candidate)
            .map(|((u, h), c)| u * h + (1.0 - u) * c)
            .collect();
        Ok(Tensor::from_vec(next, n, hd)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dl4mt::weights::RandomInit;
    use approx::assert_abs_diff_eq;
    use s2s_tensor::{CpuBackend, Shape};

    fn gru(input: usize, hidden: usize) -> GruWeights {
        GruWeights::build(&mut RandomInit::new(3), "g", input, hidden).unwrap()
    }

    #[test]
    fn test_step_shapes() {
        let g = gru(3, 4);
        assert_eq!(g.input_dim(), 3);
        assert_eq!(g.hidden_dim(), 4);

        let x = Tensor::zeros(Shape::matrix(2, 3));
        let h = Tensor::zeros(Shape::matrix(2, 4));
        let next = g.step(&x, &h, &CpuBackend::new()).unwrap();
        assert_eq!(next.shape().dims(), &[2, 4]);
    }

    #[test]
    fn test_rows_are_independent() {
        let g = gru(2, 3);
        let backend = CpuBackend::new();
        let x = Tensor::from_rows(&[vec![0.3, -0.2], vec![1.0, 0.5]], 2).unwrap();
        let h = Tensor::from_rows(&[vec![0.1, 0.0, -0.1], vec![0.4, 0.2, 0.0]], 3).unwrap();
        let both = g.step(&x, &h, &backend).unwrap();

        let second = g
            .step(&x.gather_rows(&[1]).unwrap(), &h.gather_rows(&[1]).unwrap(), &backend)
            .unwrap();
        for (a, b) in both.row(1).iter().zip(second.row(0)) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_state_width_checked() {
        let g = gru(2, 3);
        let x = Tensor::zeros(Shape::matrix(1, 2));
        let h = Tensor::zeros(Shape::matrix(1, 2));
        assert!(g.step(&x, &h, &CpuBackend::new()).is_err());
    }
}
