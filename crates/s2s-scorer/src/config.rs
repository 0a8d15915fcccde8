use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use s2s_model::ModelError;

use crate::device::DeviceInfo;
use crate::error::{Result, ScorerError};

/// Scorer backends that can be built from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerKind {
    EncoderDecoder,
}

impl ScorerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScorerKind::EncoderDecoder => "encoder-decoder",
        }
    }
}

impl FromStr for ScorerKind {
    type Err = ScorerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "encoder-decoder" => Ok(ScorerKind::EncoderDecoder),
            other => Err(ModelError::UnsupportedArchitecture(other.to_string()).into()),
        }
    }
}

impl fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scorer entry of a decoder configuration.
///
/// `type` is resolved by [`crate::BackendLoader`]; it is kept as a string
/// here so an unknown backend is reported by name at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorerConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub path: PathBuf,
    #[serde(default)]
    pub tab: usize,
}

impl ScorerConfig {
    pub fn kind(&self) -> Result<ScorerKind> {
        self.kind.parse()
    }
}

fn default_cpu_threads() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    pub scorers: Vec<ScorerConfig>,
    #[serde(default = "default_cpu_threads")]
    pub cpu_threads: usize,
}

impl DecoderConfig {
    pub fn from_json_str(json: &str) -> Result<DecoderConfig> {
        let config: DecoderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file. Relative model paths are resolved against
    /// the directory holding the file.
    pub fn from_path(path: &Path) -> Result<DecoderConfig> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_json_str(&text)?;
        if let Some(dir) = path.parent() {
            for scorer in &mut config.scorers {
                if scorer.path.is_relative() {
                    scorer.path = dir.join(&scorer.path);
                }
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scorers.is_empty() {
            return Err(ScorerError::Config("no scorers configured".to_string()));
        }
        if self.cpu_threads == 0 {
            return Err(ScorerError::Config("cpu_threads must be > 0".to_string()));
        }
        let mut seen = HashSet::new();
        for scorer in &self.scorers {
            if !seen.insert(scorer.name.as_str()) {
                return Err(ScorerError::Config(format!(
                    "duplicate scorer name '{}'",
                    scorer.name
                )));
            }
        }
        Ok(())
    }

    /// One device slot per worker thread.
    pub fn devices(&self) -> Vec<DeviceInfo> {
        (0..self.cpu_threads).map(DeviceInfo::cpu).collect()
    }
}
