use crate::error::{Result, ScorerError};

/// Tracks where a scorer is in its protocol so out-of-order calls fail
/// instead of producing scores against the wrong source or beam.
///
/// ```text
/// set_source -> begin_sentence_state -> (decode -> assemble_beam_state)*
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lifecycle {
    source_bound: bool,
    beam_width: Option<usize>,
    decoded: bool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new source invalidates the bound beam and the last step's outputs.
    pub fn source_bound(&mut self) {
        *self = Lifecycle {
            source_bound: true,
            beam_width: None,
            decoded: false,
        };
    }

    pub fn require_source(&self, op: &'static str) -> Result<()> {
        if self.source_bound {
            Ok(())
        } else {
            Err(ScorerError::SourceNotSet { op })
        }
    }

    pub fn began(&mut self, batch_size: usize) {
        self.beam_width = Some(batch_size);
    }

    /// `rows` must match the width bound by the last begin or assemble.
    pub fn check_decode(&self, rows: usize) -> Result<()> {
        self.check_rows("decode", rows)
    }

    /// The state being reassembled must be the one bound for this source.
    pub fn check_assemble(&self, rows: usize) -> Result<()> {
        self.check_rows("assemble_beam_state", rows)
    }

    fn check_rows(&self, op: &'static str, rows: usize) -> Result<()> {
        self.require_source(op)?;
        let expected = self
            .beam_width
            .ok_or(ScorerError::StateNotInitialized { op })?;
        if rows != expected {
            return Err(ScorerError::RowMismatch {
                expected,
                got: rows,
            });
        }
        Ok(())
    }

    pub fn decoded(&mut self) {
        self.decoded = true;
    }

    pub fn require_decoded(&self) -> Result<()> {
        if self.decoded {
            Ok(())
        } else {
            Err(ScorerError::NothingDecoded)
        }
    }

    pub fn assembled(&mut self, beam_width: usize) {
        self.beam_width = Some(beam_width);
    }

    /// The short list may only change before the first decode of a search.
    pub fn check_filter(&self) -> Result<()> {
        if self.decoded {
            Err(ScorerError::FilterMidSearch)
        } else {
            Ok(())
        }
    }

    pub fn beam_width(&self) -> Option<usize> {
        self.beam_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let mut l = Lifecycle::new();
        assert!(matches!(l.check_decode(1), Err(ScorerError::SourceNotSet { .. })));

        l.source_bound();
        assert!(matches!(
            l.check_decode(1),
            Err(ScorerError::StateNotInitialized { .. })
        ));

        l.began(1);
        l.check_decode(1).unwrap();
        assert!(matches!(
            l.check_decode(2),
            Err(ScorerError::RowMismatch { expected: 1, got: 2 })
        ));

        l.check_filter().unwrap();
        l.decoded();
        assert!(matches!(l.check_filter(), Err(ScorerError::FilterMidSearch)));

        l.check_assemble(1).unwrap();
        assert!(matches!(
            l.check_assemble(2),
            Err(ScorerError::RowMismatch { expected: 1, got: 2 })
        ));
        l.assembled(3);
        assert_eq!(l.beam_width(), Some(3));
        l.check_decode(3).unwrap();

        l.source_bound();
        assert_eq!(l.beam_width(), None);
        assert!(matches!(
            l.check_assemble(3),
            Err(ScorerError::StateNotInitialized { op: "assemble_beam_state" })
        ));
        assert!(matches!(l.require_decoded(), Err(ScorerError::NothingDecoded)));
        l.check_filter().unwrap();
    }
}
