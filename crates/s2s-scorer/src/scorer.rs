use s2s_tensor::{Tensor, TensorError};

use crate::beam::Hypothesis;
use crate::device::DeviceInfo;
use crate::error::Result;
use crate::sentence::Sentences;
use crate::state::State;

/// Outcome of an explicit score lookup.
///
/// Backends that cannot score arbitrary (row, word) pairs answer with
/// `NotImplemented` and one zero per requested pair, so a search keeps
/// running with a neutral contribution from that backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreLookup {
    Scores(Vec<f32>),
    NotImplemented(Vec<f32>),
}

impl ScoreLookup {
    pub fn is_implemented(&self) -> bool {
        matches!(self, ScoreLookup::Scores(_))
    }

    pub fn values(&self) -> &[f32] {
        match self {
            ScoreLookup::Scores(v) | ScoreLookup::NotImplemented(v) => v,
        }
    }

    pub fn into_values(self) -> Vec<f32> {
        match self {
            ScoreLookup::Scores(v) | ScoreLookup::NotImplemented(v) => v,
        }
    }
}

/// One model backend as seen by the beam search.
///
/// A scorer instance belongs to one worker thread and one search at a
/// time. Its weights may be shared with other instances, but everything a
/// search mutates (source context, short list, last step's outputs) lives
/// in the instance.
///
/// Calls must follow
/// `set_source -> begin_sentence_state -> (decode -> assemble_beam_state)*`;
/// anything else is rejected with an error.
pub trait Scorer: Send {
    type State: State;

    /// Configured name, unique within a decoder.
    fn name(&self) -> &str;

    /// Token stream of each source sentence this scorer encodes.
    fn tab(&self) -> usize;

    fn device(&self) -> DeviceInfo;

    /// An empty state with no rows; fill it with `begin_sentence_state`.
    fn new_state(&self) -> Self::State;

    /// Bind a new batch of source sentences, replacing any previous one.
    fn set_source(&mut self, sentences: &Sentences) -> Result<()>;

    /// Reset `state` to `batch_size` hypotheses that have emitted nothing.
    fn begin_sentence_state(&mut self, state: &mut Self::State, batch_size: usize) -> Result<()>;

    /// Score the next word for every row of `state_in`.
    ///
    /// `state_out` receives the advanced state with the same number of rows;
    /// `state_in` is left untouched. Afterwards `probs()` and `attention()`
    /// describe this step.
    fn decode(&mut self, state_in: &Self::State, state_out: &mut Self::State) -> Result<()>;

    /// Rebuild the state for the hypotheses that survived the last step.
    ///
    /// Row `i` of `state_out` continues row `beam[i].prev_index` of
    /// `state_in` and carries the embedding of `beam[i].word`.
    fn assemble_beam_state(
        &mut self,
        state_in: &Self::State,
        beam: &[Hypothesis],
        state_out: &mut Self::State,
    ) -> Result<()>;

    /// Alignment weights of the last decode, `[rows, source length]`.
    fn attention(&self) -> Result<&Tensor>;

    /// Size of the full target vocabulary, ignoring any short list.
    fn vocab_size(&self) -> usize;

    /// Restrict scoring to `ids` for the current search.
    fn filter(&mut self, ids: &[usize]) -> Result<()>;

    /// Score the whole vocabulary again.
    fn reset_filter(&mut self) -> Result<()>;

    /// Vocabulary id of each probability column, or `None` when columns
    /// are vocabulary ids.
    fn filter_ids(&self) -> Option<&[usize]>;

    /// Output scores of the last decode, `[rows, active vocabulary]`.
    fn probs(&self) -> Result<&Tensor>;

    /// Rows bound by the last `begin_sentence_state` or `assemble_beam_state`.
    fn beam_width(&self) -> Option<usize>;

    /// Scores for explicit `(row, vocabulary id)` pairs.
    fn scores(&self, ids: &[(usize, usize)]) -> ScoreLookup {
        log::warn!("{}: scores lookup is not implemented, returning zeros", self.name());
        ScoreLookup::NotImplemented(vec![0.0; ids.len()])
    }

    /// `(vocabulary id, score)` for every active column of one probability row.
    fn word_scores(&self, row: usize) -> Result<Vec<(usize, f32)>> {
        let probs = self.probs()?;
        if row >= probs.rows() {
            return Err(TensorError::RowOutOfRange {
                index: row,
                rows: probs.rows(),
            }
            .into());
        }
        let values = probs.row(row);
        Ok(match self.filter_ids() {
            Some(ids) => ids.iter().copied().zip(values.iter().copied()).collect(),
            None => values.iter().copied().enumerate().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_values() {
        let done = ScoreLookup::Scores(vec![-1.0, -2.0]);
        assert!(done.is_implemented());
        assert_eq!(done.values(), &[-1.0, -2.0]);

        let missing = ScoreLookup::NotImplemented(vec![0.0; 3]);
        assert!(!missing.is_implemented());
        assert_eq!(missing.into_values(), vec![0.0, 0.0, 0.0]);
    }
}
