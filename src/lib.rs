//! # Variant calling and allele co-occurrence
//!
//! Turns an aligned reference/consensus pair into compact variant records,
//! and a read pileup over known variant sites into pairwise allele
//! co-occurrence, the signal used to spot linked mutations in recombinant or
//! mixed samples.
//!
//! ## Usage Example
//!
//! ```
//! use varlink::genomics::{find_variants, format_variant_string};
//!
//! let variants = find_variants(b"ATGCATGC", b"AT-CATGT")?;
//! assert_eq!(format_variant_string(&variants), "3:del1;8:CT");
//! # Ok::<(), varlink::genomics::VariantCallerError>(())
//! ```
//!
//! Every entry point is a synchronous transformation over in-memory inputs;
//! separate samples can be processed independently in parallel.

#![warn(missing_docs, missing_debug_implementations)]

pub mod genomics; // Variant calling, pileup and co-occurrence

/// Default minimum base quality for a pileup observation to count.
pub const DEFAULT_MIN_BASE_QUALITY: u8 = 13;

/// Default cap on reads considered per pileup column.
pub const DEFAULT_MAX_DEPTH: u32 = 8000;

/// Parameters shared by the pileup stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Bases with a lower Phred quality are left out of pileup columns.
    pub min_base_quality: u8,

    /// Maximum number of reads contributing to one column.
    pub max_depth: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_base_quality: DEFAULT_MIN_BASE_QUALITY,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl AnalysisConfig {
    /// Override the minimum base quality.
    pub fn with_min_base_quality(mut self, min_base_quality: u8) -> Self {
        self.min_base_quality = min_base_quality;
        self
    }

    /// Override the per-column depth cap.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }
}
