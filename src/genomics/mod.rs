//! Genomics primitives: pairwise variant calling, pileup summaries and
//! read-level allele co-occurrence.
//!
//! Two flows share these types:
//!
//! - aligned reference/consensus pair → [`call_variants`] → [`VariantRecord`]
//! - reference + pileup columns → [`PileupScanner`] → [`PileupRecord`]s and a
//!   [`ReadAlleleMap`] → [`CooccurrenceAnalyzer`] → [`CooccurrenceEntry`]s

mod codec;
mod cooccurrence;
mod indels;
mod io;
mod pileup;
mod read_alleles;
mod reference;
mod statistics;
mod types;
mod variant_caller;
mod vcf;

pub use codec::{
    format_variant_string, join_variant_reports, parse_variant_report, parse_variant_string,
    CodecError, ParsedReport, RejectedRecord, SnpAlleles, VariantDict, VariantRecord,
    VariantSites, REPORT_HEADER,
};
pub use cooccurrence::{
    write_cooccurrence_json, CooccurrenceAnalyzer, CooccurrenceEntry, CooccurrenceTable,
    CountMatrix, IndicatorMatrix,
};
pub use indels::{merge_indel_runs, IndelKind};
pub use io::{load_reference, load_sequence_pair, read_alignment_tsv, scan_bam};
pub use pileup::{
    write_pileup_csv, BaseCounts, PileupAggregator, PileupColumn, PileupEntry, PileupError,
    PileupRecord, PileupScan, PileupScanner, ReadEvent, ReadPileup,
};
pub use read_alleles::{ReadAlleleExtractor, ReadAlleleMap};
pub use reference::ReferenceBaseMap;
pub use statistics::{ambiguity_percent, non_ref_percent, round_to};
pub use types::{AlignedRead, AlignedSequence, Base, CigarOp, CigarOpKind, SequencePair};
pub use variant_caller::{call_variants, find_variants, Variant, VariantCallerError, VariantKind};
pub use vcf::parse_vcf;
