use s2s_tensor::Tensor;

use crate::error::{Result, ScorerError};

/// A surviving partial translation, as the search driver hands it back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hypothesis {
    /// Word emitted at this step, a full-vocabulary id.
    pub word: u32,
    /// Row of the previous state this hypothesis extends.
    pub prev_index: usize,
    /// Cumulative cost; scorers never read it.
    pub cost: f32,
}

impl Hypothesis {
    pub fn new(word: u32, prev_index: usize, cost: f32) -> Self {
        Hypothesis {
            word,
            prev_index,
            cost,
        }
    }
}

/// Surviving hypotheses of one step, in output row order.
pub type Beam = Vec<Hypothesis>;

/// The two index columns of a beam, checked against the state they
/// reassemble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeamIndex {
    words: Vec<u32>,
    parents: Vec<usize>,
}

impl BeamIndex {
    /// Split `beam` into word and parent columns, rejecting an empty beam
    /// and any parent outside `0..parent_rows`.
    pub fn from_beam(beam: &[Hypothesis], parent_rows: usize) -> Result<BeamIndex> {
        if beam.is_empty() {
            return Err(ScorerError::EmptyBeam);
        }
        if let Some((index, h)) = beam
            .iter()
            .enumerate()
            .find(|(_, h)| h.prev_index >= parent_rows)
        {
            return Err(ScorerError::ParentOutOfRange {
                index,
                parent: h.prev_index,
                rows: parent_rows,
            });
        }
        Ok(BeamIndex {
            words: beam.iter().map(|h| h.word).collect(),
            parents: beam.iter().map(|h| h.prev_index).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn parents(&self) -> &[usize] {
        &self.parents
    }

    /// Row `i` of the result is row `parents()[i]` of `previous`.
    /// Parents may repeat or be skipped.
    pub fn reassemble(&self, previous: &Tensor) -> Result<Tensor> {
        Ok(previous.gather_rows(&self.parents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns() {
        let beam = vec![
            Hypothesis::new(4, 1, -0.5),
            Hypothesis::new(2, 1, -0.7),
            Hypothesis::new(9, 0, -1.2),
        ];
        let idx = BeamIndex::from_beam(&beam, 2).unwrap();
        assert_eq!(idx.len(), 3);
        assert_eq!(idx.words(), &[4, 2, 9]);
        assert_eq!(idx.parents(), &[1, 1, 0]);
    }

    #[test]
    fn test_reassemble_duplicates_and_drops() {
        let prev = Tensor::from_rows(&[vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]], 2).unwrap();
        let beam = vec![Hypothesis::new(0, 2, 0.0), Hypothesis::new(0, 2, 0.0)];
        let out = BeamIndex::from_beam(&beam, 3).unwrap().reassemble(&prev).unwrap();
        assert_eq!(out.data_f32(), &[3.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_rejects_bad_beam() {
        assert!(matches!(BeamIndex::from_beam(&[], 2), Err(ScorerError::EmptyBeam)));
        let beam = vec![Hypothesis::new(0, 0, 0.0), Hypothesis::new(1, 2, 0.0)];
        assert!(matches!(
            BeamIndex::from_beam(&beam, 2),
            Err(ScorerError::ParentOutOfRange { index: 1, parent: 2, rows: 2 })
        ));
    }
}
