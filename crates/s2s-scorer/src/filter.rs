use crate::error::{Result, ScorerError};

/// A validated vocabulary short list: sorted, without duplicates, every id
/// inside the target vocabulary.
///
/// Column `k` of a filtered probability matrix belongs to `ids()[k]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSet {
    ids: Vec<usize>,
}

impl FilterSet {
    pub fn new(ids: &[usize], vocab_size: usize) -> Result<FilterSet> {
        if ids.is_empty() {
            return Err(ScorerError::EmptyFilter);
        }
        if let Some(&id) = ids.iter().find(|&&id| id >= vocab_size) {
            return Err(ScorerError::FilterOutOfRange { id, vocab_size });
        }
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        Ok(FilterSet { ids })
    }

    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: usize) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    /// Probability column holding word `id`, if the word is in the list.
    pub fn column_of(&self, id: usize) -> Option<usize> {
        self.ids.binary_search(&id).ok()
    }
}
