//! Attention GRU encoder/decoder in the dl4mt layout.
//!
//! The encoder runs a forward and a backward GRU over the source embeddings
//! and concatenates their outputs into per-position annotations. The
//! decoder is a conditional GRU: one GRU consumes the previous target
//! embedding, attention over the annotations yields a context vector, and
//! a second GRU consumes that context.

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod gru;
pub mod weights;

pub use config::Dl4mtConfig;
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use gru::GruWeights;
pub use weights::Weights;
