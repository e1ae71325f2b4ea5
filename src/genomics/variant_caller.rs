use thiserror::Error;
use tracing::debug;

use super::indels::{merge_indel_runs, IndelKind};
use super::types::{Base, SequencePair};

/// Variant detected between a reference and a consensus row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    /// 1-based alignment column of the variant (first column for indel runs).
    pub position: u32,
    /// What changed at this position.
    pub kind: VariantKind,
}

/// Variant classes reported by the pairwise caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    /// Single-nucleotide substitution.
    Snp {
        /// Base in the reference row.
        reference: Base,
        /// Base in the consensus row.
        alternate: Base,
    },
    /// Run of consensus bases aligned against reference gaps.
    Insertion {
        /// Number of consecutive columns in the run.
        length: u32,
    },
    /// Run of consensus gaps aligned against reference bases.
    Deletion {
        /// Number of consecutive columns in the run.
        length: u32,
    },
}

impl Variant {
    /// Substitution at `position`.
    pub fn snp(position: u32, reference: Base, alternate: Base) -> Self {
        Self {
            position,
            kind: VariantKind::Snp {
                reference,
                alternate,
            },
        }
    }

    /// Indel run of `length` columns starting at `position`.
    pub fn indel(position: u32, kind: IndelKind, length: u32) -> Self {
        let kind = match kind {
            IndelKind::Insertion => VariantKind::Insertion { length },
            IndelKind::Deletion => VariantKind::Deletion { length },
        };
        Self { position, kind }
    }

    /// Reference/alternate bases for substitutions.
    pub fn snp_alleles(&self) -> Option<(Base, Base)> {
        match self.kind {
            VariantKind::Snp {
                reference,
                alternate,
            } => Some((reference, alternate)),
            _ => None,
        }
    }
}

/// Errors originating from variant calling.
#[derive(Debug, Error)]
pub enum VariantCallerError {
    /// The two alignment rows do not cover the same number of columns.
    #[error("aligned sequences differ in length: reference {reference}, consensus {consensus}")]
    AlignmentLengthMismatch {
        /// Reference row length.
        reference: usize,
        /// Consensus row length.
        consensus: usize,
    },
}

/// Compare both rows column by column and emit variants in position order.
///
/// Mismatches involving an ambiguity code on either side are not reported.
pub fn call_variants(pair: &SequencePair) -> Vec<Variant> {
    let mut snps = Vec::new();
    let mut insertions = Vec::new();
    let mut deletions = Vec::new();

    for (idx, (reference, consensus)) in pair.columns().enumerate() {
        if reference == consensus {
            continue;
        }
        let position = idx as u32 + 1;
        if reference.is_certain() && consensus.is_certain() {
            snps.push(Variant::snp(position, reference, consensus));
        } else if consensus.is_gap() {
            deletions.push(position);
        } else if reference.is_gap() {
            insertions.push(position);
        }
    }

    let mut variants = snps;
    variants.extend(merge_indel_runs(&insertions, IndelKind::Insertion));
    variants.extend(merge_indel_runs(&deletions, IndelKind::Deletion));
    variants.sort_by_key(|variant| variant.position);

    debug!(
        columns = pair.len(),
        variants = variants.len(),
        "called variants from aligned pair"
    );
    variants
}

/// Call variants directly from two ASCII alignment rows.
pub fn find_variants(
    reference: &[u8],
    consensus: &[u8],
) -> Result<Vec<Variant>, VariantCallerError> {
    let pair = SequencePair::from_ascii(reference, consensus)?;
    Ok(call_variants(&pair))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(variants: &[Variant]) -> Vec<String> {
        variants.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn substitution_is_reported() {
        let variants = find_variants(b"ATGC", b"ATGT").unwrap();
        assert_eq!(tokens(&variants), vec!["4:CT"]);
    }

    #[test]
    fn ambiguity_is_suppressed() {
        assert!(find_variants(b"ATGC", b"ATGN").unwrap().is_empty());
        assert!(find_variants(b"ATNC", b"ATGC").unwrap().is_empty());
        // N against a gap is neither an insertion nor a deletion call
        let variants = find_variants(b"AT-C", b"ATNC").unwrap();
        assert_eq!(tokens(&variants), vec!["3:ins1"]);
    }

    #[test]
    fn deletion_and_snp_are_ordered() {
        let variants = find_variants(b"ATGCATGC", b"AT-CATGT").unwrap();
        assert_eq!(tokens(&variants), vec!["3:del1", "8:CT"]);
    }

    #[test]
    fn runs_are_merged_and_interleaved() {
        let variants = find_variants(b"A--CGTACG", b"ATTAG--CC").unwrap();
        assert_eq!(tokens(&variants), vec!["2:ins2", "4:CA", "6:del2", "9:GC"]);
    }

    #[test]
    fn lowercase_input_is_normalised() {
        let variants = find_variants(b"acgt", b"ACGA").unwrap();
        assert_eq!(tokens(&variants), vec!["4:TA"]);
    }

    #[test]
    fn unequal_rows_fail() {
        assert!(matches!(
            find_variants(b"ACGT", b"ACGTA"),
            Err(VariantCallerError::AlignmentLengthMismatch { .. })
        ));
    }
}
