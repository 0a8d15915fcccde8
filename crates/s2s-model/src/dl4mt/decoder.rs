use std::sync::Arc;

use s2s_tensor::{ComputeBackend, Shape, Tensor, TensorError};

use crate::error::{ModelError, Result};
use super::weights::Weights;

/// Output projection restricted to a subset of the target vocabulary.
#[derive(Debug, Clone)]
struct ShortList {
    ids: Vec<usize>,
    w_output: Tensor,
    b_output: Tensor,
}

/// One decoder instance: stateless with respect to hypotheses, but owns the
/// attention and probability buffers of its most recent step and an
/// optional vocabulary short list.
///
/// Each scorer gets its own `Decoder`; the weights behind it are shared.
#[derive(Debug, Clone)]
pub struct Decoder {
    weights: Arc<Weights>,
    backend: Arc<dyn ComputeBackend>,
    attention: Tensor,
    probs: Tensor,
    short_list: Option<ShortList>,
}

impl Decoder {
    pub fn new(weights: Arc<Weights>, backend: Arc<dyn ComputeBackend>) -> Self {
        Decoder {
            weights,
            backend,
            attention: Tensor::zeros(Shape::matrix(0, 0)),
            probs: Tensor::zeros(Shape::matrix(0, 0)),
            short_list: None,
        }
    }

    /// Full target vocabulary size, regardless of any short list.
    pub fn vocab_size(&self) -> usize {
        self.weights.config().target_vocab_size
    }

    pub fn hidden_dim(&self) -> usize {
        self.weights.config().hidden_dim
    }

    pub fn embedding_dim(&self) -> usize {
        self.weights.config().embedding_dim
    }

    /// Initial recurrent state, `tanh(mean(context) W_init + b_init)`,
    /// repeated for `batch_size` rows.
    pub fn empty_state(&self, context: &Tensor, batch_size: usize) -> Result<Tensor> {
        let dec = &self.weights.decoder;
        let backend = self.backend.as_ref();
        let mean = context.mean_rows()?;
        let projected = mean.matmul(&dec.init_w, backend)?;
        let h = self.hidden_dim();
        let biased = backend.add_bias(projected.data_f32(), dec.init_b.data_f32(), h)?;
        let init = Tensor::from_vec(backend.tanh(&biased)?, 1, h)?;
        Ok(init.broadcast_rows(batch_size)?)
    }

    /// Zero embeddings: nothing has been emitted yet.
    pub fn empty_embedding(&self, batch_size: usize) -> Tensor {
        Tensor::zeros(Shape::matrix(batch_size, self.embedding_dim()))
    }

    /// Target embeddings for full-vocabulary word ids, one row per word.
    pub fn lookup(&self, words: &[u32]) -> Result<Tensor> {
        let vocab_size = self.vocab_size();
        if let Some(&id) = words.iter().find(|&&w| w as usize >= vocab_size) {
            return Err(ModelError::TokenOutOfRange { id, vocab_size });
        }
        let ids: Vec<usize> = words.iter().map(|&w| w as usize).collect();
        Ok(self.weights.decoder.embeddings.gather_rows(&ids)?)
    }

    /// Run one step for every row and return the next hidden state.
    ///
    /// Afterwards `attention()` is `[rows, source_len]` and `probs()` holds
    /// natural-log probabilities, `[rows, active vocabulary]`.
    pub fn decode(
        &mut self,
        hidden: &Tensor,
        embeddings: &Tensor,
        context: &Tensor,
    ) -> Result<Tensor> {
        let n = hidden.rows();
        if embeddings.rows() != n {
            return Err(TensorError::ShapeMismatch {
                expected: vec![n, self.embedding_dim()],
                got: embeddings.shape().dims().to_vec(),
            }
            .into());
        }

        let dec = &self.weights.decoder;
        let backend = self.backend.as_ref();

        let h1 = dec.gru1.step(embeddings, hidden, backend)?;
        let (alpha, attended) = self.attend(&h1, context)?;
        let h2 = dec.gru2.step(&attended, &h1, backend)?;
        let logits = self.readout(&h2, embeddings, &attended)?;

        let cols = logits.cols();
        let log_probs = backend.log_softmax(logits.data_f32(), cols)?;
        self.probs = Tensor::from_vec(log_probs, n, cols)?;
        self.attention = alpha;
        Ok(h2)
    }

    /// Returns (alignment weights `[n, L]`, attended context `[n, C]`).
    fn attend(&self, h1: &Tensor, context: &Tensor) -> Result<(Tensor, Tensor)> {
        let att = &self.weights.decoder.attention;
        let backend = self.backend.as_ref();
        let (src_len, c) = context.shape().as_matrix()?;
        let n = h1.rows();

        let ctx_proj = context.matmul(&att.w_context, backend)?;
        let ctx_proj = backend.add_bias(ctx_proj.data_f32(), att.b.data_f32(), c)?;
        let state_proj = h1.matmul(&att.w_state, backend)?;

        let mut pre = Vec::with_capacity(n * src_len * c);
        for i in 0..n {
            let s = state_proj.row(i);
            for ctx_row in ctx_proj.chunks(c) {
                pre.extend(ctx_row.iter().zip(s).map(|(p, q)| p + q));
            }
        }
        let activated = Tensor::from_vec(backend.tanh(&pre)?, n * src_len, c)?;
        let energies = activated.matmul(&att.v, backend)?;

        let alpha = Tensor::from_vec(backend.softmax(energies.data_f32(), src_len)?, n, src_len)?;
        let attended = alpha.matmul(context, backend)?;
        Ok((alpha, attended))
    }

    fn readout(&self, h2: &Tensor, embeddings: &Tensor, attended: &Tensor) -> Result<Tensor> {
        let r = &self.weights.decoder.readout;
        let backend = self.backend.as_ref();
        let e = self.embedding_dim();

        let from_state = h2.matmul(&r.w_hidden, backend)?;
        let from_embedding = embeddings.matmul(&r.w_embedding, backend)?;
        let from_context = attended.matmul(&r.w_context, backend)?;
        let sum = backend.add(from_state.data_f32(), from_embedding.data_f32())?;
        let sum = backend.add(&sum, from_context.data_f32())?;
        let sum = backend.add_bias(&sum, r.b.data_f32(), e)?;
        let t = Tensor::from_vec(backend.tanh(&sum)?, h2.rows(), e)?;

        let (w_output, b_output) = match &self.short_list {
            Some(s) => (&s.w_output, &s.b_output),
            None => (&r.w_output, &r.b_output),
        };
        let logits = t.matmul(w_output, backend)?;
        let cols = w_output.cols();
        let logits = backend.add_bias(logits.data_f32(), b_output.data_f32(), cols)?;
        Ok(Tensor::from_vec(logits, h2.rows(), cols)?)
    }

    /// Alignment weights of the last `decode`.
    pub fn attention(&self) -> &Tensor {
        &self.attention
    }

    /// Log-probabilities of the last `decode`. Column `k` is word
    /// `filter_ids()[k]` when a short list is active, word `k` otherwise.
    pub fn probs(&self) -> &Tensor {
        &self.probs
    }

    /// Score only `ids` from now on. Ids are full-vocabulary word ids.
    pub fn filter(&mut self, ids: &[usize]) -> Result<()> {
        if ids.is_empty() {
            return Err(ModelError::Other("empty vocabulary short list".to_string()));
        }
        let r = &self.weights.decoder.readout;
        let vocab_size = self.vocab_size();
        if let Some(&id) = ids.iter().find(|&&id| id >= vocab_size) {
            return Err(ModelError::TokenOutOfRange {
                id: id as u32,
                vocab_size,
            });
        }
        self.short_list = Some(ShortList {
            ids: ids.to_vec(),
            w_output: r.w_output.select_columns(ids)?,
            b_output: r.b_output.select_columns(ids)?,
        });
        Ok(())
    }

    pub fn reset_filter(&mut self) {
        self.short_list = None;
    }

    pub fn filter_ids(&self) -> Option<&[usize]> {
        self.short_list.as_ref().map(|s| s.ids.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dl4mt::{Dl4mtConfig, Encoder};
    use approx::assert_abs_diff_eq;
    use s2s_tensor::CpuBackend;

    fn setup() -> (Encoder, Decoder) {
        let cfg = Dl4mtConfig {
            source_vocab_size: 8,
            target_vocab_size: 6,
            embedding_dim: 4,
            hidden_dim: 3,
        };
        let weights = Arc::new(Weights::random(cfg, 21).unwrap());
        let backend: Arc<dyn ComputeBackend> = Arc::new(CpuBackend::new());
        (
            Encoder::new(weights.clone(), backend.clone()),
            Decoder::new(weights, backend),
        )
    }

    #[test]
    fn test_step_outputs_are_distributions() {
        let (enc, mut dec) = setup();
        let ctx = enc.encode(&[1, 2, 7, 0]).unwrap();
        let h0 = dec.empty_state(&ctx, 2).unwrap();
        let y0 = dec.empty_embedding(2);
        assert_eq!(h0.shape().dims(), &[2, 3]);
        assert_eq!(h0.row(0), h0.row(1));

        let h1 = dec.decode(&h0, &y0, &ctx).unwrap();
        assert_eq!(h1.shape().dims(), &[2, 3]);
        assert_eq!(dec.attention().shape().dims(), &[2, 4]);
        assert_eq!(dec.probs().shape().dims(), &[2, 6]);

        for r in 0..2 {
            let att: f32 = dec.attention().row(r).iter().sum();
            assert_abs_diff_eq!(att, 1.0, epsilon = 1e-5);
            let mass: f32 = dec.probs().row(r).iter().map(|lp| lp.exp()).sum();
            assert_abs_diff_eq!(mass, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_short_list_renormalises_full_distribution() {
        let (enc, mut dec) = setup();
        let ctx = enc.encode(&[3, 4]).unwrap();
        let h0 = dec.empty_state(&ctx, 1).unwrap();
        let y0 = dec.lookup(&[2]).unwrap();

        dec.decode(&h0, &y0, &ctx).unwrap();
        let full = dec.probs().row(0).to_vec();

        dec.filter(&[1, 4, 5]).unwrap();
        dec.decode(&h0, &y0, &ctx).unwrap();
        assert_eq!(dec.filter_ids(), Some(&[1, 4, 5][..]));
        assert_eq!(dec.probs().cols(), 3);

        let log_z = [1, 4, 5].iter().map(|&i| full[i].exp()).sum::<f32>().ln();
        for (k, &id) in [1usize, 4, 5].iter().enumerate() {
            assert_abs_diff_eq!(dec.probs().row(0)[k], full[id] - log_z, epsilon = 1e-5);
        }

        dec.reset_filter();
        dec.decode(&h0, &y0, &ctx).unwrap();
        assert_eq!(dec.probs().cols(), 6);
    }

    #[test]
    fn test_filter_validation() {
        let (_, mut dec) = setup();
        assert!(dec.filter(&[]).is_err());
        assert!(matches!(
            dec.filter(&[0, 6]),
            Err(ModelError::TokenOutOfRange { id: 6, .. })
        ));
        assert!(dec.filter_ids().is_none());
    }

    #[test]
    fn test_lookup_rows_match_embedding_table() {
        let (_, dec) = setup();
        let y = dec.lookup(&[5, 0, 5]).unwrap();
        assert_eq!(y.rows(), 3);
        assert_eq!(y.row(0), y.row(2));
        assert!(dec.lookup(&[6]).is_err());
    }

    #[test]
    fn test_mismatched_rows_rejected() {
        let (enc, mut dec) = setup();
        let ctx = enc.encode(&[1]).unwrap();
        let h0 = dec.empty_state(&ctx, 2).unwrap();
        let y0 = dec.empty_embedding(3);
        assert!(dec.decode(&h0, &y0, &ctx).is_err());
    }
}
