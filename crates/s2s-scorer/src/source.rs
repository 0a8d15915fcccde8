use s2s_tensor::Tensor;

/// The encoded form of one source sentence.
///
/// Built once by `set_source` and read by every decode step of that
/// sentence's search. There is no mutable access.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceContext {
    sentence_id: usize,
    annotations: Tensor,
}

impl SourceContext {
    pub fn new(sentence_id: usize, annotations: Tensor) -> Self {
        SourceContext {
            sentence_id,
            annotations,
        }
    }

    pub fn sentence_id(&self) -> usize {
        self.sentence_id
    }

    /// `[source_len, context_dim]`, one row per source position.
    pub fn annotations(&self) -> &Tensor {
        &self.annotations
    }

    /// Number of source positions (columns of every attention row).
    pub fn len(&self) -> usize {
        self.annotations.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.rows() == 0
    }
}
