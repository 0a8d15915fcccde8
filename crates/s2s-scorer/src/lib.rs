//! `s2s-scorer` - the contract between model backends and a beam search.
//!
//! A beam-search driver talks to every backend through the [`Scorer`]
//! trait:
//!
//! 1. [`Scorer::set_source`] binds a batch of source sentences.
//! 2. [`Scorer::begin_sentence_state`] fills a fresh [`State`].
//! 3. [`Scorer::decode`] scores the current hypotheses; the driver reads
//!    [`Scorer::probs`] and picks survivors.
//! 4. [`Scorer::assemble_beam_state`] rebuilds the state so that row `i`
//!    belongs to survivor `i`, then the loop continues at 3.
//!
//! Concrete backends are selected from configuration through
//! [`BackendLoader`]; their weights are loaded once and shared.

pub mod backend;
pub mod beam;
pub mod config;
pub mod device;
pub mod encoder_decoder;
pub mod error;
pub mod filter;
pub mod lifecycle;
pub mod loader;
pub mod scorer;
pub mod sentence;
pub mod source;
pub mod state;

pub use backend::{BackendScorer, BackendState};
pub use beam::{Beam, BeamIndex, Hypothesis};
pub use config::{DecoderConfig, ScorerConfig, ScorerKind};
pub use device::{DeviceInfo, DeviceKind};
pub use encoder_decoder::{EncoderDecoderScorer, EncoderDecoderState};
pub use error::{Result, ScorerError};
pub use filter::FilterSet;
pub use loader::{load_all, BackendLoader, EncoderDecoderLoader};
pub use scorer::{ScoreLookup, Scorer};
pub use sentence::{Sentence, Sentences};
pub use source::SourceContext;
pub use state::State;
