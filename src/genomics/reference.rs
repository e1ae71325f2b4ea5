use super::pileup::PileupError;
use super::types::Base;

/// Reference base at every 0-based offset of one reference sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceBaseMap {
    bases: Vec<Base>,
}

impl ReferenceBaseMap {
    /// Build the map from raw ASCII, normalising case and ambiguity codes.
    pub fn from_sequence(sequence: &[u8]) -> Self {
        Self {
            bases: sequence.iter().map(|&b| Base::from_ascii(b)).collect(),
        }
    }

    /// Reference base at `offset`, failing when the offset is out of range.
    pub fn base_at(&self, offset: u32) -> Result<Base, PileupError> {
        self.bases
            .get(offset as usize)
            .copied()
            .ok_or(PileupError::UnknownReferenceBase(offset))
    }

    /// Reference length.
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// True for an empty reference.
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_and_miss() {
        let map = ReferenceBaseMap::from_sequence(b"acgN");
        assert_eq!(map.base_at(0).unwrap(), Base::A);
        assert_eq!(map.base_at(3).unwrap(), Base::N);
        assert!(matches!(
            map.base_at(4),
            Err(PileupError::UnknownReferenceBase(4))
        ));
    }
}
