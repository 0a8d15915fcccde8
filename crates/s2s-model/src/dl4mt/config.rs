use crate::error::{ModelError, Result};
use crate::gguf::metadata::GgufMetadata;

/// Hyperparameters of a dl4mt model, parsed from GGUF metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dl4mtConfig {
    pub source_vocab_size: usize,
    pub target_vocab_size: usize,
    /// Width of source and target word embeddings.
    pub embedding_dim: usize,
    /// Width of every GRU state.
    pub hidden_dim: usize,
}

impl Dl4mtConfig {
    pub const SOURCE_VOCAB_KEY: &'static str = "s2s.source_vocab_size";
    pub const TARGET_VOCAB_KEY: &'static str = "s2s.target_vocab_size";
    pub const EMBEDDING_KEY: &'static str = "s2s.embedding_length";
    pub const HIDDEN_KEY: &'static str = "s2s.hidden_size";

    /// Width of one encoder annotation (forward and backward states side by side).
    pub fn context_dim(&self) -> usize {
        2 * self.hidden_dim
    }

    pub fn from_gguf(metadata: &GgufMetadata) -> Result<Dl4mtConfig> {
        let config = Dl4mtConfig {
            source_vocab_size: metadata.get_u32(Self::SOURCE_VOCAB_KEY)? as usize,
            target_vocab_size: metadata.get_u32(Self::TARGET_VOCAB_KEY)? as usize,
            embedding_dim: metadata.get_u32(Self::EMBEDDING_KEY)? as usize,
            hidden_dim: metadata.get_u32(Self::HIDDEN_KEY)? as usize,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            (Self::SOURCE_VOCAB_KEY, self.source_vocab_size),
            (Self::TARGET_VOCAB_KEY, self.target_vocab_size),
            (Self::EMBEDDING_KEY, self.embedding_dim),
            (Self::HIDDEN_KEY, self.hidden_dim),
        ];
        match fields.iter().find(|(_, v)| *v == 0) {
            Some((key, _)) => Err(ModelError::Other(format!("{} must be > 0", key))),
            None => Ok(()),
        }
    }
}
