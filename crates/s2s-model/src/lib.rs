//! `s2s-model` - model weights and network for seq2seq-runtime.
//!
//! Weights live in a GGUF v3 container and are loaded once, then shared
//! read-only (`Arc<Weights>`) by every encoder and decoder built on them.

pub mod architecture;
pub mod dl4mt;
pub mod error;
pub mod gguf;

pub use architecture::Architecture;
pub use dl4mt::{Decoder, Dl4mtConfig, Encoder, Weights};
pub use error::{ModelError, Result};
