use crate::error::{Result, ScorerError};

/// One tokenized source sentence.
///
/// A sentence may carry several parallel token streams ("tabs"), e.g. a
/// word stream and a factor stream; each scorer reads the tab it was
/// configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    id: usize,
    tabs: Vec<Vec<u32>>,
}

impl Sentence {
    pub fn new(id: usize, tabs: Vec<Vec<u32>>) -> Self {
        Sentence { id, tabs }
    }

    /// A sentence with a single token stream.
    pub fn single(id: usize, words: Vec<u32>) -> Self {
        Sentence {
            id,
            tabs: vec![words],
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn words(&self, tab: usize) -> Result<&[u32]> {
        self.tabs
            .get(tab)
            .map(Vec::as_slice)
            .ok_or(ScorerError::MissingTab {
                sentence: self.id,
                tab,
            })
    }
}

/// An ordered batch of sentences handed to `Scorer::set_source`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentences {
    sentences: Vec<Sentence>,
}

impl Sentences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sentence: Sentence) {
        self.sentences.push(sentence);
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Sentence> {
        self.sentences.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sentence> {
        self.sentences.iter()
    }
}

impl From<Vec<Sentence>> for Sentences {
    fn from(sentences: Vec<Sentence>) -> Self {
        Sentences { sentences }
    }
}

impl FromIterator<Sentence> for Sentences {
    fn from_iter<I: IntoIterator<Item = Sentence>>(iter: I) -> Self {
        Sentences {
            sentences: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tabs() {
        let s = Sentence::new(4, vec![vec![1, 2], vec![7, 7]]);
        assert_eq!(s.tab_count(), 2);
        assert_eq!(s.words(1).unwrap(), &[7, 7]);
        assert!(matches!(
            s.words(2),
            Err(ScorerError::MissingTab { sentence: 4, tab: 2 })
        ));
    }

    #[test]
    fn test_batch() {
        let batch: Sentences = (0..3).map(|i| Sentence::single(i, vec![i as u32])).collect();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.get(2).unwrap().id(), 2);
        assert!(Sentences::new().is_empty());
    }
}
