use std::fmt;

use s2s_tensor::Tensor;

use crate::error::{Result, ScorerError};

/// A backend's per-hypothesis recurrent memory.
///
/// Row `i` of `hidden()` and row `i` of `embeddings()` always describe the
/// same hypothesis, and both have exactly one row per active hypothesis.
/// Callers only read a state; scorers mutate it.
pub trait State: fmt::Debug + Send {
    /// Backend tag, used in error messages.
    fn backend(&self) -> &'static str;

    /// Recurrent hidden values, `[beam width, hidden dim]`.
    fn hidden(&self) -> &Tensor;

    /// Embedding of each hypothesis' last emitted word, `[beam width, embedding dim]`.
    fn embeddings(&self) -> &Tensor;

    /// Current beam width.
    fn rows(&self) -> usize {
        self.hidden().rows()
    }

    fn debug_string(&self) -> String {
        format!(
            "{} state: hidden {}, embeddings {}",
            self.backend(),
            describe(self.hidden()),
            describe(self.embeddings())
        )
    }

    /// Merge states of other backends scoring the same hypotheses.
    ///
    /// No backend implements this yet: ensembles keep one state per
    /// backend and combine probabilities outside the scorers.
    fn join_states(&mut self, others: &[&dyn State]) -> Result<()> {
        log::warn!(
            "{}: join_states over {} states is not implemented",
            self.backend(),
            others.len()
        );
        Err(ScorerError::NotImplemented("join_states"))
    }
}

/// Short diagnostic summary of a matrix: shape, sum and leading values.
pub fn describe(t: &Tensor) -> String {
    const SHOWN: usize = 4;
    let data = t.data_f32();
    let sum = data.iter().fold(0.0f32, |acc, v| acc + v);
    let head: Vec<String> = data.iter().take(SHOWN).map(|v| format!("{:.4}", v)).collect();
    let ellipsis = if data.len() > SHOWN { ", ..." } else { "" };
    format!("{} sum={:.4} [{}{}]", t.shape(), sum, head.join(", "), ellipsis)
}
