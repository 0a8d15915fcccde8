use std::path::{Path, PathBuf};
use std::sync::Arc;

use s2s_model::Weights;
use s2s_tensor::{ComputeBackend, CpuBackend};

use crate::backend::BackendScorer;
use crate::config::{DecoderConfig, ScorerConfig, ScorerKind};
use crate::device::DeviceInfo;
use crate::encoder_decoder::EncoderDecoderScorer;
use crate::error::{Result, ScorerError};

/// Loads dl4mt weights once and hands out scorers that share them.
#[derive(Debug, Clone)]
pub struct EncoderDecoderLoader {
    name: String,
    tab: usize,
    path: PathBuf,
    backend: Arc<dyn ComputeBackend>,
    weights: Option<Arc<Weights>>,
}

impl EncoderDecoderLoader {
    pub fn new(config: &ScorerConfig) -> Self {
        EncoderDecoderLoader {
            name: config.name.clone(),
            tab: config.tab,
            path: config.path.clone(),
            backend: Arc::new(CpuBackend::new()),
            weights: None,
        }
    }

    /// A loader over weights that are already in memory.
    pub fn from_weights(name: impl Into<String>, tab: usize, weights: Arc<Weights>) -> Self {
        EncoderDecoderLoader {
            name: name.into(),
            tab,
            path: PathBuf::new(),
            backend: Arc::new(CpuBackend::new()),
            weights: Some(weights),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn ComputeBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the model file. A failure here means no scorer can be built.
    pub fn load(&mut self) -> Result<()> {
        log::info!("Loading model {}", self.path.display());
        let weights = Weights::open(&self.path)?;
        let cfg = weights.config();
        log::info!(
            "{}: vocab {} -> {}, embedding {}, hidden {}, backend {}",
            self.name,
            cfg.source_vocab_size,
            cfg.target_vocab_size,
            cfg.embedding_dim,
            cfg.hidden_dim,
            self.backend.name()
        );
        self.weights = Some(Arc::new(weights));
        Ok(())
    }

    pub fn weights(&self) -> Option<&Arc<Weights>> {
        self.weights.as_ref()
    }

    pub fn new_scorer(&self, device: DeviceInfo) -> Result<EncoderDecoderScorer> {
        let weights = self
            .weights
            .as_ref()
            .ok_or_else(|| ScorerError::NotLoaded(self.name.clone()))?;
        log::debug!("{}: new scorer on {}", self.name, device);
        Ok(EncoderDecoderScorer::new(
            self.name.clone(),
            self.tab,
            device,
            weights.clone(),
            self.backend.clone(),
        ))
    }
}

/// Loader for whichever backend a scorer entry names.
#[derive(Debug, Clone)]
pub enum BackendLoader {
    EncoderDecoder(EncoderDecoderLoader),
}

impl BackendLoader {
    pub fn from_config(config: &ScorerConfig) -> Result<BackendLoader> {
        match config.kind()? {
            ScorerKind::EncoderDecoder => Ok(BackendLoader::EncoderDecoder(
                EncoderDecoderLoader::new(config),
            )),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            BackendLoader::EncoderDecoder(l) => l.name(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        match self {
            BackendLoader::EncoderDecoder(l) => l.load(),
        }
    }

    pub fn new_scorer(&self, device: DeviceInfo) -> Result<BackendScorer> {
        match self {
            BackendLoader::EncoderDecoder(l) => {
                Ok(BackendScorer::EncoderDecoder(l.new_scorer(device)?))
            }
        }
    }
}

/// Build and load every scorer entry, failing on the first bad one.
pub fn load_all(config: &DecoderConfig) -> Result<Vec<BackendLoader>> {
    config.validate()?;
    config
        .scorers
        .iter()
        .map(|scorer| {
            let mut loader = BackendLoader::from_config(scorer)?;
            loader.load()?;
            Ok(loader)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::Scorer;
    use s2s_model::gguf::TensorType;
    use s2s_model::{Dl4mtConfig, ModelError};

    fn scorer_config(path: PathBuf) -> ScorerConfig {
        ScorerConfig {
            name: "F0".to_string(),
            kind: "encoder-decoder".to_string(),
            path,
            tab: 0,
        }
    }

    #[test]
    fn test_scorer_before_load_rejected() {
        let loader = EncoderDecoderLoader::new(&scorer_config(PathBuf::from("x.gguf")));
        assert!(loader.weights().is_none());
        assert!(matches!(
            loader.new_scorer(DeviceInfo::default()),
            Err(ScorerError::NotLoaded(name)) if name == "F0"
        ));
    }

    #[test]
    fn test_missing_model_is_fatal() {
        let config = scorer_config(PathBuf::from("/nonexistent/m.gguf"));
        let mut loader = BackendLoader::from_config(&config).unwrap();
        assert!(matches!(loader.load(), Err(ScorerError::Model(ModelError::Io(_)))));
    }

    #[test]
    fn test_scorers_share_loaded_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.gguf");
        let cfg = Dl4mtConfig {
            source_vocab_size: 6,
            target_vocab_size: 5,
            embedding_dim: 3,
            hidden_dim: 2,
        };
        Weights::random(cfg, 4).unwrap().save(&path, TensorType::F32).unwrap();

        let mut loader = EncoderDecoderLoader::new(&scorer_config(path));
        loader.load().unwrap();
        let a = loader.new_scorer(DeviceInfo::cpu(0)).unwrap();
        let b = loader.new_scorer(DeviceInfo::cpu(1)).unwrap();
        assert_eq!(Arc::strong_count(loader.weights().unwrap()), 5);
        assert_eq!(a.vocab_size(), 5);
        assert_eq!(b.device(), DeviceInfo::cpu(1));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut cfg = scorer_config(PathBuf::from("m"));
        cfg.kind = "transformer".to_string();
        assert!(matches!(
            BackendLoader::from_config(&cfg),
            Err(ScorerError::Model(ModelError::UnsupportedArchitecture(_)))
        ));
    }
}
