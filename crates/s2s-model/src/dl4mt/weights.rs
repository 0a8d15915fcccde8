use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use s2s_tensor::Tensor;

use crate::architecture::{Architecture, ARCHITECTURE_KEY};
use crate::error::{ModelError, Result};
use crate::gguf::{GgufFile, GgufWriter, TensorType};
use super::config::Dl4mtConfig;
use super::gru::GruWeights;

/// Where parameter matrices come from while a `Weights` is being built.
pub(crate) trait ParamSource {
    fn param(&mut self, name: &str, rows: usize, cols: usize) -> Result<Tensor>;
}

/// Reads parameters out of a GGUF file, checking each shape.
struct GgufSource<'a>(&'a GgufFile);

impl ParamSource for GgufSource<'_> {
    fn param(&mut self, name: &str, rows: usize, cols: usize) -> Result<Tensor> {
        let t = self.0.get_tensor(name)?;
        if t.shape().dims() != [rows, cols] {
            return Err(ModelError::TensorShape {
                name: name.to_string(),
                expected: vec![rows, cols],
                got: t.shape().dims().to_vec(),
            });
        }
        Ok(t)
    }
}

/// Seeded uniform initialisation in `[-1/sqrt(rows), 1/sqrt(rows))`.
pub(crate) struct RandomInit(StdRng);

impl RandomInit {
    pub(crate) fn new(seed: u64) -> Self {
        RandomInit(StdRng::seed_from_u64(seed))
    }
}

impl ParamSource for RandomInit {
    fn param(&mut self, _name: &str, rows: usize, cols: usize) -> Result<Tensor> {
        let scale = 1.0 / (rows.max(1) as f32).sqrt();
        let data = (0..rows * cols)
            .map(|_| self.0.gen_range(-scale..scale))
            .collect();
        Ok(Tensor::from_vec(data, rows, cols)?)
    }
}

/// Source side of the network.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderWeights {
    /// [source_vocab, embedding]
    pub embeddings: Tensor,
    pub forward: GruWeights,
    pub backward: GruWeights,
}

/// Additive attention: `v . tanh(ctx W_context + b + h W_state)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttentionWeights {
    /// [context, context]
    pub w_context: Tensor,
    /// [1, context]
    pub b: Tensor,
    /// [hidden, context]
    pub w_state: Tensor,
    /// [context, 1]
    pub v: Tensor,
}

/// Deep output layer feeding the vocabulary projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadoutWeights {
    /// [hidden, embedding]
    pub w_hidden: Tensor,
    /// [embedding, embedding]
    pub w_embedding: Tensor,
    /// [context, embedding]
    pub w_context: Tensor,
    /// [1, embedding]
    pub b: Tensor,
    /// [embedding, target_vocab]
    pub w_output: Tensor,
    /// [1, target_vocab]
    pub b_output: Tensor,
}

/// Target side of the network.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderWeights {
    /// [target_vocab, embedding]
    pub embeddings: Tensor,
    /// [context, hidden]
    pub init_w: Tensor,
    /// [1, hidden]
    pub init_b: Tensor,
    /// Consumes the previous target embedding.
    pub gru1: GruWeights,
    pub attention: AttentionWeights,
    /// Consumes the attended context.
    pub gru2: GruWeights,
    pub readout: ReadoutWeights,
}

/// Every parameter of a dl4mt model.
///
/// Loaded once and never mutated; share it between scorers with `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights {
    config: Dl4mtConfig,
    pub encoder: EncoderWeights,
    pub decoder: DecoderWeights,
}

impl Weights {
    /// Open a GGUF model file and load every parameter.
    pub fn open(path: &Path) -> Result<Weights> {
        let gguf = GgufFile::open(path)?;
        Self::from_gguf(&gguf)
    }

    pub fn from_gguf(gguf: &GgufFile) -> Result<Weights> {
        match Architecture::from_metadata(&gguf.metadata)? {
            Architecture::Dl4mt => {}
        }
        let config = Dl4mtConfig::from_gguf(&gguf.metadata)?;
        Self::build(config, &mut GgufSource(gguf))
    }

    /// Deterministic random weights, for smoke tests and benchmarks.
    pub fn random(config: Dl4mtConfig, seed: u64) -> Result<Weights> {
        config.validate()?;
        Self::build(config, &mut RandomInit::new(seed))
    }

    fn build(config: Dl4mtConfig, src: &mut dyn ParamSource) -> Result<Weights> {
        let (sv, tv) = (config.source_vocab_size, config.target_vocab_size);
        let (e, h, c) = (config.embedding_dim, config.hidden_dim, config.context_dim());

        let encoder = EncoderWeights {
            embeddings: src.param("encoder.embeddings", sv, e)?,
            forward: GruWeights::build(src, "encoder.forward", e, h)?,
            backward: GruWeights::build(src, "encoder.backward", e, h)?,
        };

        let decoder = DecoderWeights {
            embeddings: src.param("decoder.embeddings", tv, e)?,
            init_w: src.param("decoder.init.w", c, h)?,
            init_b: src.param("decoder.init.b", 1, h)?,
            gru1: GruWeights::build(src, "decoder.gru1", e, h)?,
            attention: AttentionWeights {
                w_context: src.param("decoder.attention.w_context", c, c)?,
                b: src.param("decoder.attention.b", 1, c)?,
                w_state: src.param("decoder.attention.w_state", h, c)?,
                v: src.param("decoder.attention.v", c, 1)?,
            },
            gru2: GruWeights::build(src, "decoder.gru2", c, h)?,
            readout: ReadoutWeights {
                w_hidden: src.param("decoder.readout.w_hidden", h, e)?,
                w_embedding: src.param("decoder.readout.w_embedding", e, e)?,
                w_context: src.param("decoder.readout.w_context", c, e)?,
                b: src.param("decoder.readout.b", 1, e)?,
                w_output: src.param("decoder.output.w", e, tv)?,
                b_output: src.param("decoder.output.b", 1, tv)?,
            },
        };

        Ok(Weights {
            config,
            encoder,
            decoder,
        })
    }

    pub fn config(&self) -> &Dl4mtConfig {
        &self.config
    }

    /// Calls `f` with the file name and value of every parameter.
    pub fn visit(&self, f: &mut dyn FnMut(&str, &Tensor)) {
        let enc = &self.encoder;
        f("encoder.embeddings", &enc.embeddings);
        enc.forward.visit("encoder.forward", f);
        enc.backward.visit("encoder.backward", f);

        let dec = &self.decoder;
        f("decoder.embeddings", &dec.embeddings);
        f("decoder.init.w", &dec.init_w);
        f("decoder.init.b", &dec.init_b);
        dec.gru1.visit("decoder.gru1", f);
        f("decoder.attention.w_context", &dec.attention.w_context);
        f("decoder.attention.b", &dec.attention.b);
        f("decoder.attention.w_state", &dec.attention.w_state);
        f("decoder.attention.v", &dec.attention.v);
        dec.gru2.visit("decoder.gru2", f);
        f("decoder.readout.w_hidden", &dec.readout.w_hidden);
        f("decoder.readout.w_embedding", &dec.readout.w_embedding);
        f("decoder.readout.w_context", &dec.readout.w_context);
        f("decoder.readout.b", &dec.readout.b);
        f("decoder.output.w", &dec.readout.w_output);
        f("decoder.output.b", &dec.readout.b_output);
    }

    /// Write the model as a GGUF file that `Weights::open` reads back.
    pub fn save(&self, path: &Path, dtype: TensorType) -> Result<()> {
        let cfg = &self.config;
        let mut w = GgufWriter::new();
        w.add_string(ARCHITECTURE_KEY, Architecture::Dl4mt.as_str())
            .add_u32(Dl4mtConfig::SOURCE_VOCAB_KEY, cfg.source_vocab_size as u32)
            .add_u32(Dl4mtConfig::TARGET_VOCAB_KEY, cfg.target_vocab_size as u32)
            .add_u32(Dl4mtConfig::EMBEDDING_KEY, cfg.embedding_dim as u32)
            .add_u32(Dl4mtConfig::HIDDEN_KEY, cfg.hidden_dim as u32);
        self.visit(&mut |name, tensor| {
            w.add_tensor(name, tensor, dtype);
        });
        w.write_to_path(path)
    }
}
