use std::fmt;
use std::sync::Arc;

use super::variant_caller::VariantCallerError;

/// Nucleotide symbol as seen in an alignment or pileup.
///
/// Any symbol outside `A`, `C`, `G`, `T` and the gap `-` is collapsed to `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Base {
    /// Adenine.
    A,
    /// Cytosine.
    C,
    /// Guanine.
    G,
    /// Thymine.
    T,
    /// Ambiguous or unknown base.
    N,
    /// Alignment gap.
    Gap,
}

impl Base {
    /// Normalise an ASCII symbol, mapping anything unrecognised to `N`.
    pub fn from_ascii(symbol: u8) -> Self {
        Self::try_from_ascii(symbol).unwrap_or(Base::N)
    }

    /// Strict conversion accepting only `ACGTN-` (either case).
    pub fn try_from_ascii(symbol: u8) -> Option<Self> {
        match symbol {
            b'A' | b'a' => Some(Base::A),
            b'C' | b'c' => Some(Base::C),
            b'G' | b'g' => Some(Base::G),
            b'T' | b't' => Some(Base::T),
            b'N' | b'n' => Some(Base::N),
            b'-' => Some(Base::Gap),
            _ => None,
        }
    }

    /// ASCII representation.
    pub fn as_char(self) -> char {
        match self {
            Base::A => 'A',
            Base::C => 'C',
            Base::G => 'G',
            Base::T => 'T',
            Base::N => 'N',
            Base::Gap => '-',
        }
    }

    /// True for the four unambiguous nucleotides.
    pub fn is_certain(self) -> bool {
        matches!(self, Base::A | Base::C | Base::G | Base::T)
    }

    /// True for the gap symbol.
    pub fn is_gap(self) -> bool {
        self == Base::Gap
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Gap-padded sequence taken from a pairwise alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedSequence {
    bases: Vec<Base>,
}

impl AlignedSequence {
    /// Build from raw ASCII, normalising case and ambiguity codes.
    pub fn from_ascii(sequence: &[u8]) -> Self {
        Self {
            bases: sequence.iter().map(|&b| Base::from_ascii(b)).collect(),
        }
    }

    /// Number of alignment columns.
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// True when the sequence holds no columns.
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Bases in alignment order.
    pub fn bases(&self) -> &[Base] {
        &self.bases
    }
}

impl From<&str> for AlignedSequence {
    fn from(sequence: &str) -> Self {
        Self::from_ascii(sequence.as_bytes())
    }
}

/// Reference and consensus rows of one pairwise alignment.
///
/// Both rows always have the same length; construction enforces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePair {
    reference: AlignedSequence,
    consensus: AlignedSequence,
}

impl SequencePair {
    /// Pair two aligned rows, rejecting unequal lengths.
    pub fn new(
        reference: AlignedSequence,
        consensus: AlignedSequence,
    ) -> Result<Self, VariantCallerError> {
        if reference.len() != consensus.len() {
            return Err(VariantCallerError::AlignmentLengthMismatch {
                reference: reference.len(),
                consensus: consensus.len(),
            });
        }
        Ok(Self {
            reference,
            consensus,
        })
    }

    /// Convenience constructor from raw ASCII rows.
    pub fn from_ascii(reference: &[u8], consensus: &[u8]) -> Result<Self, VariantCallerError> {
        Self::new(
            AlignedSequence::from_ascii(reference),
            AlignedSequence::from_ascii(consensus),
        )
    }

    /// Reference row.
    pub fn reference(&self) -> &AlignedSequence {
        &self.reference
    }

    /// Consensus row.
    pub fn consensus(&self) -> &AlignedSequence {
        &self.consensus
    }

    /// Shared alignment length.
    pub fn len(&self) -> usize {
        self.reference.len()
    }

    /// True for an empty alignment.
    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }

    /// Iterate `(reference, consensus)` columns.
    pub fn columns(&self) -> impl Iterator<Item = (Base, Base)> + '_ {
        self.reference
            .bases()
            .iter()
            .copied()
            .zip(self.consensus.bases().iter().copied())
    }
}

/// Simple CIGAR operation kinds describing how a read aligns to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOpKind {
    /// Consuming match/mismatch.
    Match,
    /// Insertion relative to the reference.
    Insertion,
    /// Deletion relative to the reference.
    Deletion,
    /// Skipped reference region (spliced alignment).
    RefSkip,
    /// Soft clipping (sequence present in read only).
    SoftClip,
    /// Hard clipping (trimmed sequence not present in read).
    HardClip,
}

impl CigarOpKind {
    /// Whether the operation advances along the read sequence.
    pub fn consumes_query(self) -> bool {
        matches!(
            self,
            CigarOpKind::Match | CigarOpKind::Insertion | CigarOpKind::SoftClip
        )
    }
}

/// CIGAR operation with length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    /// Operation kind.
    pub kind: CigarOpKind,
    /// Number of bases affected by the operation.
    pub len: u32,
}

impl CigarOp {
    /// Construct a new CIGAR operation.
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self { kind, len }
    }

    /// Parse a SAM-style CIGAR string (`*` yields no operations).
    pub fn parse_cigar(cigar: &str) -> Option<Vec<CigarOp>> {
        if cigar == "*" {
            return Some(Vec::new());
        }

        let mut ops = Vec::new();
        let mut len: Option<u32> = None;
        for symbol in cigar.chars() {
            if let Some(digit) = symbol.to_digit(10) {
                len = Some(len.unwrap_or(0).checked_mul(10)?.checked_add(digit)?);
                continue;
            }
            let kind = match symbol {
                'M' | '=' | 'X' => CigarOpKind::Match,
                'I' => CigarOpKind::Insertion,
                'D' => CigarOpKind::Deletion,
                'N' => CigarOpKind::RefSkip,
                'S' => CigarOpKind::SoftClip,
                'H' | 'P' => CigarOpKind::HardClip,
                _ => return None,
            };
            ops.push(CigarOp::new(kind, len.take()?));
        }

        if len.is_some() {
            return None;
        }
        Some(ops)
    }
}

/// Aligned read with sequence and quality information.
#[derive(Debug, Clone)]
pub struct AlignedRead {
    /// Read (query) name.
    pub name: Arc<str>,
    /// 0-based leftmost reference coordinate.
    pub pos: u32,
    /// CIGAR describing the alignment.
    pub cigar: Vec<CigarOp>,
    /// Read sequence stored as uppercase ASCII.
    pub sequence: Arc<[u8]>,
    /// Per-base quality scores in Phred space.
    pub qualities: Arc<[u8]>,
}

impl AlignedRead {
    /// Construct a new aligned read wrapper.
    pub fn new(
        name: impl Into<Arc<str>>,
        pos: u32,
        cigar: Vec<CigarOp>,
        sequence: impl Into<Arc<[u8]>>,
        qualities: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            pos,
            cigar,
            sequence: sequence.into(),
            qualities: qualities.into(),
        }
    }

    /// Read length inferred from the sequence.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// True when the read carries no bases.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Base at the provided read offset.
    pub fn base_at(&self, offset: usize) -> Option<u8> {
        self.sequence.get(offset).copied()
    }

    /// Quality score at the provided read offset.
    pub fn quality_at(&self, offset: usize) -> Option<u8> {
        self.qualities.get(offset).copied()
    }
}
