use thiserror::Error;

/// Everything a scorer can refuse to do.
///
/// Apart from `NotImplemented` and the load/config variants, these are
/// sequencing violations: the caller broke the scorer protocol and any
/// scores produced afterwards would be meaningless.
#[derive(Error, Debug)]
pub enum ScorerError {
    #[error("{0} is not implemented by this backend")]
    NotImplemented(&'static str),
    #[error("{op} called before set_source")]
    SourceNotSet { op: &'static str },
    #[error("{op} called before begin_sentence_state")]
    StateNotInitialized { op: &'static str },
    #[error("state has {got} rows but the bound beam width is {expected}")]
    RowMismatch { expected: usize, got: usize },
    #[error("state has {hidden} hidden rows but {embeddings} embedding rows")]
    InconsistentState { hidden: usize, embeddings: usize },
    #[error("hypothesis {index} extends row {parent} but the previous state has {rows} rows")]
    ParentOutOfRange {
        index: usize,
        parent: usize,
        rows: usize,
    },
    #[error("cannot assemble an empty beam")]
    EmptyBeam,
    #[error("batch size must be > 0")]
    EmptyBatch,
    #[error("sentence batch is empty")]
    NoSentences,
    #[error("sentence {sentence} has no tab {tab}")]
    MissingTab { sentence: usize, tab: usize },
    #[error("filter changed after the first decode of a search")]
    FilterMidSearch,
    #[error("filter set is empty")]
    EmptyFilter,
    #[error("filter id {id} out of range for vocabulary of {vocab_size}")]
    FilterOutOfRange { id: usize, vocab_size: usize },
    #[error("no decode has run since the source was bound")]
    NothingDecoded,
    #[error("state of backend '{got}' passed to a '{expected}' scorer")]
    StateMismatch {
        expected: &'static str,
        got: &'static str,
    },
    #[error("model for scorer '{0}' has not been loaded")]
    NotLoaded(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model error: {0}")]
    Model(#[from] s2s_model::ModelError),
    #[error("tensor error: {0}")]
    Tensor(#[from] s2s_tensor::TensorError),
}

pub type Result<T> = std::result::Result<T, ScorerError>;
