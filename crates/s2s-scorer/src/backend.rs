use s2s_tensor::Tensor;

use crate::beam::Hypothesis;
use crate::device::DeviceInfo;
use crate::encoder_decoder::{EncoderDecoderScorer, EncoderDecoderState};
use crate::error::{Result, ScorerError};
use crate::scorer::{ScoreLookup, Scorer};
use crate::sentence::Sentences;
use crate::state::State;

/// State of whichever backend a [`BackendScorer`] wraps.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendState {
    EncoderDecoder(EncoderDecoderState),
}

impl BackendState {
    #[allow(unreachable_patterns)]
    fn as_encoder_decoder(&self) -> Result<&EncoderDecoderState> {
        match self {
            BackendState::EncoderDecoder(s) => Ok(s),
            other => Err(ScorerError::StateMismatch {
                expected: EncoderDecoderState::BACKEND,
                got: other.backend(),
            }),
        }
    }

    #[allow(unreachable_patterns)]
    fn as_encoder_decoder_mut(&mut self) -> Result<&mut EncoderDecoderState> {
        match self {
            BackendState::EncoderDecoder(s) => Ok(s),
            other => Err(ScorerError::StateMismatch {
                expected: EncoderDecoderState::BACKEND,
                got: other.backend(),
            }),
        }
    }
}

impl State for BackendState {
    fn backend(&self) -> &'static str {
        match self {
            BackendState::EncoderDecoder(s) => s.backend(),
        }
    }

    fn hidden(&self) -> &Tensor {
        match self {
            BackendState::EncoderDecoder(s) => s.hidden(),
        }
    }

    fn embeddings(&self) -> &Tensor {
        match self {
            BackendState::EncoderDecoder(s) => s.embeddings(),
        }
    }

    fn join_states(&mut self, others: &[&dyn State]) -> Result<()> {
        match self {
            BackendState::EncoderDecoder(s) => s.join_states(others),
        }
    }
}

/// A scorer chosen from configuration at runtime.
///
/// Every operation is forwarded to the wrapped backend. States must come
/// from the same variant's `new_state`.
#[derive(Debug)]
pub enum BackendScorer {
    EncoderDecoder(EncoderDecoderScorer),
}

impl Scorer for BackendScorer {
    type State = BackendState;

    fn name(&self) -> &str {
        match self {
            BackendScorer::EncoderDecoder(s) => s.name(),
        }
    }

    fn tab(&self) -> usize {
        match self {
            BackendScorer::EncoderDecoder(s) => s.tab(),
        }
    }

    fn device(&self) -> DeviceInfo {
        match self {
            BackendScorer::EncoderDecoder(s) => s.device(),
        }
    }

    fn new_state(&self) -> BackendState {
        match self {
            BackendScorer::EncoderDecoder(s) => BackendState::EncoderDecoder(s.new_state()),
        }
    }

    fn set_source(&mut self, sentences: &Sentences) -> Result<()> {
        match self {
            BackendScorer::EncoderDecoder(s) => s.set_source(sentences),
        }
    }

    fn begin_sentence_state(&mut self, state: &mut BackendState, batch_size: usize) -> Result<()> {
        match self {
            BackendScorer::EncoderDecoder(s) => {
                s.begin_sentence_state(state.as_encoder_decoder_mut()?, batch_size)
            }
        }
    }

    fn decode(&mut self, state_in: &BackendState, state_out: &mut BackendState) -> Result<()> {
        match self {
            BackendScorer::EncoderDecoder(s) => s.decode(
                state_in.as_encoder_decoder()?,
                state_out.as_encoder_decoder_mut()?,
            ),
        }
    }

    fn assemble_beam_state(
        &mut self,
        state_in: &BackendState,
        beam: &[Hypothesis],
        state_out: &mut BackendState,
    ) -> Result<()> {
        match self {
            BackendScorer::EncoderDecoder(s) => s.assemble_beam_state(
                state_in.as_encoder_decoder()?,
                beam,
                state_out.as_encoder_decoder_mut()?,
            ),
        }
    }

    fn attention(&self) -> Result<&Tensor> {
        match self {
            BackendScorer::EncoderDecoder(s) => s.attention(),
        }
    }

    fn vocab_size(&self) -> usize {
        match self {
            BackendScorer::EncoderDecoder(s) => s.vocab_size(),
        }
    }

    fn filter(&mut self, ids: &[usize]) -> Result<()> {
        match self {
            BackendScorer::EncoderDecoder(s) => s.filter(ids),
        }
    }

    fn reset_filter(&mut self) -> Result<()> {
        match self {
            BackendScorer::EncoderDecoder(s) => s.reset_filter(),
        }
    }

    fn filter_ids(&self) -> Option<&[usize]> {
        match self {
            BackendScorer::EncoderDecoder(s) => s.filter_ids(),
        }
    }

    fn probs(&self) -> Result<&Tensor> {
        match self {
            BackendScorer::EncoderDecoder(s) => s.probs(),
        }
    }

    fn beam_width(&self) -> Option<usize> {
        match self {
            BackendScorer::EncoderDecoder(s) => s.beam_width(),
        }
    }

    fn scores(&self, ids: &[(usize, usize)]) -> ScoreLookup {
        match self {
            BackendScorer::EncoderDecoder(s) => s.scores(ids),
        }
    }
}

impl From<EncoderDecoderScorer> for BackendScorer {
    fn from(s: EncoderDecoderScorer) -> Self {
        BackendScorer::EncoderDecoder(s)
    }
}
