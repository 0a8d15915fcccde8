use std::sync::Arc;

use s2s_tensor::{ComputeBackend, Shape, Tensor};

use crate::error::{ModelError, Result};
use super::weights::Weights;

/// Turns source token ids into per-position annotations.
#[derive(Debug, Clone)]
pub struct Encoder {
    weights: Arc<Weights>,
    backend: Arc<dyn ComputeBackend>,
}

impl Encoder {
    pub fn new(weights: Arc<Weights>, backend: Arc<dyn ComputeBackend>) -> Self {
        Encoder { weights, backend }
    }

    /// Encode one sentence into a `[words.len(), 2 * hidden]` context matrix.
    ///
    /// Row `j` is the forward state after reading word `j` next to the
    /// backward state after reading words `j..` right to left.
    pub fn encode(&self, words: &[u32]) -> Result<Tensor> {
        if words.is_empty() {
            return Err(ModelError::EmptySource);
        }
        let cfg = self.weights.config();
        let vocab_size = cfg.source_vocab_size;
        if let Some(&id) = words.iter().find(|&&w| w as usize >= vocab_size) {
            return Err(ModelError::TokenOutOfRange { id, vocab_size });
        }

        let enc = &self.weights.encoder;
        let backend = self.backend.as_ref();
        let ids: Vec<usize> = words.iter().map(|&w| w as usize).collect();
        let embedded = enc.embeddings.gather_rows(&ids)?;

        let len = words.len();
        let mut forward = Vec::with_capacity(len);
        let mut h = Tensor::zeros(Shape::matrix(1, cfg.hidden_dim));
        for t in 0..len {
            h = enc.forward.step(&embedded.gather_rows(&[t])?, &h, backend)?;
            forward.push(h.data_f32().to_vec());
        }

        let mut backward = vec![Vec::new(); len];
        let mut h = Tensor::zeros(Shape::matrix(1, cfg.hidden_dim));
        for t in (0..len).rev() {
            h = enc.backward.step(&embedded.gather_rows(&[t])?, &h, backend)?;
            backward[t] = h.data_f32().to_vec();
        }

        let forward = Tensor::from_rows(&forward, cfg.hidden_dim)?;
        let backward = Tensor::from_rows(&backward, cfg.hidden_dim)?;
        Ok(forward.concat_cols(&backward)?)
    }
}
