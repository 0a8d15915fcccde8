use std::fmt;
use std::str::FromStr;

use crate::error::{ModelError, Result};
use crate::gguf::metadata::GgufMetadata;

/// Metadata key naming the network layout stored in a model file.
pub const ARCHITECTURE_KEY: &str = "s2s.architecture";

/// Network layouts this crate knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    /// Bidirectional GRU encoder, conditional GRU decoder with additive attention.
    Dl4mt,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Dl4mt => "dl4mt",
        }
    }

    /// Reads the architecture tag from model metadata.
    pub fn from_metadata(metadata: &GgufMetadata) -> Result<Architecture> {
        metadata.get_string(ARCHITECTURE_KEY)?.parse()
    }
}

impl FromStr for Architecture {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dl4mt" => Ok(Architecture::Dl4mt),
            other => Err(ModelError::UnsupportedArchitecture(other.to_string())),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
