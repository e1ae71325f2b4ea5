use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::genomics::{Base, PileupColumn, ReadEvent};

/// Observed allele per read at each target position.
///
/// A read without a call at a position has no entry there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadAlleleMap {
    reads: BTreeMap<Arc<str>, BTreeMap<u32, Base>>,
}

impl ReadAlleleMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record what `read_id` showed at the 1-based `position`.
    pub fn insert(&mut self, read_id: Arc<str>, position: u32, allele: Base) {
        self.reads.entry(read_id).or_default().insert(position, allele);
    }

    /// Allele observed by a read at a position, if any.
    pub fn get(&self, read_id: &str, position: u32) -> Option<Base> {
        self.reads.get(read_id)?.get(&position).copied()
    }

    /// Iterate reads with their position → allele observations.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<u32, Base>)> {
        self.reads.iter().map(|(id, alleles)| (id.as_ref(), alleles))
    }

    /// Number of reads with at least one observation.
    pub fn len(&self) -> usize {
        self.reads.len()
    }

    /// True when no read has been observed.
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }
}

/// Collects per-read alleles at a fixed set of target positions.
#[derive(Debug, Clone)]
pub struct ReadAlleleExtractor {
    targets: BTreeSet<u32>,
    alleles: ReadAlleleMap,
}

impl ReadAlleleExtractor {
    /// Track the given 1-based positions.
    pub fn new(targets: impl IntoIterator<Item = u32>) -> Self {
        Self {
            targets: targets.into_iter().collect(),
            alleles: ReadAlleleMap::new(),
        }
    }

    /// Record observations from a column if it lies on a target position.
    ///
    /// Deletions are recorded as a gap; reference skips are not recorded.
    pub fn observe(&mut self, column: &PileupColumn) {
        let position = column.position + 1;
        if !self.targets.contains(&position) {
            return;
        }
        for entry in &column.entries {
            let allele = match entry.event {
                ReadEvent::Base { base, .. } => base,
                ReadEvent::Deletion => Base::Gap,
                ReadEvent::RefSkip => continue,
            };
            self.alleles
                .insert(Arc::clone(&entry.read_id), position, allele);
        }
    }

    /// Hand back the completed map.
    pub fn finish(self) -> ReadAlleleMap {
        self.alleles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::PileupEntry;

    fn entry(read: &str, event: ReadEvent) -> PileupEntry {
        PileupEntry {
            read_id: Arc::from(read),
            event,
        }
    }

    #[test]
    fn only_target_positions_are_recorded() {
        let mut extractor = ReadAlleleExtractor::new([5]);
        extractor.observe(&PileupColumn {
            position: 3,
            entries: vec![entry("a", ReadEvent::Base { base: Base::A, quality: 40 })],
        });
        extractor.observe(&PileupColumn {
            position: 4,
            entries: vec![
                entry("a", ReadEvent::Base { base: Base::T, quality: 40 }),
                entry("b", ReadEvent::Deletion),
                entry("c", ReadEvent::RefSkip),
            ],
        });

        let alleles = extractor.finish();
        assert_eq!(alleles.len(), 2);
        assert_eq!(alleles.get("a", 5), Some(Base::T));
        assert_eq!(alleles.get("a", 4), None);
        assert_eq!(alleles.get("b", 5), Some(Base::Gap));
        assert_eq!(alleles.get("c", 5), None);
    }
}
