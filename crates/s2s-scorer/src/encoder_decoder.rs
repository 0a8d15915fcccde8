use std::sync::Arc;

use s2s_model::{Decoder, Encoder, Weights};
use s2s_tensor::{ComputeBackend, Shape, Tensor};

use crate::beam::{BeamIndex, Hypothesis};
use crate::device::DeviceInfo;
use crate::error::{Result, ScorerError};
use crate::filter::FilterSet;
use crate::lifecycle::Lifecycle;
use crate::scorer::Scorer;
use crate::sentence::Sentences;
use crate::source::SourceContext;
use crate::state::State;

/// Recurrent state of the attention GRU decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderDecoderState {
    hidden: Tensor,
    embeddings: Tensor,
}

impl EncoderDecoderState {
    pub const BACKEND: &'static str = "encoder-decoder";

    pub fn new() -> Self {
        EncoderDecoderState {
            hidden: Tensor::zeros(Shape::matrix(0, 0)),
            embeddings: Tensor::zeros(Shape::matrix(0, 0)),
        }
    }
}

impl Default for EncoderDecoderState {
    fn default() -> Self {
        Self::new()
    }
}

impl State for EncoderDecoderState {
    fn backend(&self) -> &'static str {
        Self::BACKEND
    }

    fn hidden(&self) -> &Tensor {
        &self.hidden
    }

    fn embeddings(&self) -> &Tensor {
        &self.embeddings
    }
}

/// Scorer over a dl4mt encoder and decoder.
///
/// Encodes the first sentence of each source batch once, then threads the
/// resulting context through every decode step of the search.
#[derive(Debug)]
pub struct EncoderDecoderScorer {
    name: String,
    tab: usize,
    device: DeviceInfo,
    encoder: Encoder,
    decoder: Decoder,
    source: Option<SourceContext>,
    lifecycle: Lifecycle,
}

impl EncoderDecoderScorer {
    pub fn new(
        name: impl Into<String>,
        tab: usize,
        device: DeviceInfo,
        weights: Arc<Weights>,
        backend: Arc<dyn ComputeBackend>,
    ) -> Self {
        EncoderDecoderScorer {
            name: name.into(),
            tab,
            device,
            encoder: Encoder::new(weights.clone(), backend.clone()),
            decoder: Decoder::new(weights, backend),
            source: None,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Context of the currently bound source, if any.
    pub fn source_context(&self) -> Option<&SourceContext> {
        self.source.as_ref()
    }

    fn context(&self, op: &'static str) -> Result<&SourceContext> {
        self.lifecycle.require_source(op)?;
        self.source.as_ref().ok_or(ScorerError::SourceNotSet { op })
    }
}

fn check_consistent(state: &EncoderDecoderState) -> Result<()> {
    let (hidden, embeddings) = (state.hidden.rows(), state.embeddings.rows());
    if hidden != embeddings {
        return Err(ScorerError::InconsistentState { hidden, embeddings });
    }
    Ok(())
}

impl Scorer for EncoderDecoderScorer {
    type State = EncoderDecoderState;

    fn name(&self) -> &str {
        &self.name
    }

    fn tab(&self) -> usize {
        self.tab
    }

    fn device(&self) -> DeviceInfo {
        self.device
    }

    fn new_state(&self) -> EncoderDecoderState {
        EncoderDecoderState::new()
    }

    fn set_source(&mut self, sentences: &Sentences) -> Result<()> {
        self.source = None;
        self.lifecycle = Lifecycle::new();

        let first = sentences.get(0).ok_or(ScorerError::NoSentences)?;
        if sentences.len() > 1 {
            log::warn!(
                "{}: batch of {} sentences, only sentence {} is encoded",
                self.name,
                sentences.len(),
                first.id()
            );
        }

        let words = first.words(self.tab)?;
        let annotations = self.encoder.encode(words)?;
        log::debug!(
            "{} [{}]: encoded sentence {} ({} words)",
            self.name,
            self.device,
            first.id(),
            words.len()
        );
        self.source = Some(SourceContext::new(first.id(), annotations));
        self.lifecycle.source_bound();
        Ok(())
    }

    fn begin_sentence_state(
        &mut self,
        state: &mut EncoderDecoderState,
        batch_size: usize,
    ) -> Result<()> {
        if batch_size == 0 {
            return Err(ScorerError::EmptyBatch);
        }
        let context = self.context("begin_sentence_state")?;
        state.hidden = self.decoder.empty_state(context.annotations(), batch_size)?;
        state.embeddings = self.decoder.empty_embedding(batch_size);
        self.lifecycle.began(batch_size);
        Ok(())
    }

    fn decode(
        &mut self,
        state_in: &EncoderDecoderState,
        state_out: &mut EncoderDecoderState,
    ) -> Result<()> {
        check_consistent(state_in)?;
        self.lifecycle.check_decode(state_in.rows())?;
        let context = self
            .source
            .as_ref()
            .ok_or(ScorerError::SourceNotSet { op: "decode" })?;

        let hidden = self
            .decoder
            .decode(&state_in.hidden, &state_in.embeddings, context.annotations())?;
        state_out.hidden = hidden;
        state_out.embeddings = state_in.embeddings.clone();
        self.lifecycle.decoded();

        log::trace!("{}: decoded {}", self.name, state_out.debug_string());
        Ok(())
    }

    fn assemble_beam_state(
        &mut self,
        state_in: &EncoderDecoderState,
        beam: &[Hypothesis],
        state_out: &mut EncoderDecoderState,
    ) -> Result<()> {
        check_consistent(state_in)?;
        self.lifecycle.check_assemble(state_in.rows())?;
        let index = BeamIndex::from_beam(beam, state_in.rows())?;

        let hidden = index.reassemble(&state_in.hidden)?;
        let embeddings = self.decoder.lookup(index.words())?;
        state_out.hidden = hidden;
        state_out.embeddings = embeddings;
        self.lifecycle.assembled(index.len());
        Ok(())
    }

    fn attention(&self) -> Result<&Tensor> {
        self.lifecycle.require_decoded()?;
        Ok(self.decoder.attention())
    }

    fn vocab_size(&self) -> usize {
        self.decoder.vocab_size()
    }

    fn filter(&mut self, ids: &[usize]) -> Result<()> {
        self.lifecycle.check_filter()?;
        let set = FilterSet::new(ids, self.vocab_size())?;
        self.decoder.filter(set.ids())?;
        log::debug!(
            "{}: short list of {} / {} words",
            self.name,
            set.len(),
            self.vocab_size()
        );
        Ok(())
    }

    fn reset_filter(&mut self) -> Result<()> {
        self.lifecycle.check_filter()?;
        self.decoder.reset_filter();
        Ok(())
    }

    fn filter_ids(&self) -> Option<&[usize]> {
        self.decoder.filter_ids()
    }

    fn probs(&self) -> Result<&Tensor> {
        self.lifecycle.require_decoded()?;
        Ok(self.decoder.probs())
    }

    fn beam_width(&self) -> Option<usize> {
        self.lifecycle.beam_width()
    }
}
