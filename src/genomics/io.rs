use anyhow::{anyhow, Context, Result};
use bio::io::fasta;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{AlignedRead, CigarOp, ReferenceBaseMap, SequencePair};

fn read_fasta_sequences(path: &Path) -> Result<Vec<Vec<u8>>> {
    let file =
        File::open(path).with_context(|| format!("failed to open FASTA {}", path.display()))?;
    let reader = fasta::Reader::new(BufReader::new(file));

    let mut sequences = Vec::new();
    for record in reader.records() {
        let record =
            record.with_context(|| format!("invalid FASTA record in {}", path.display()))?;
        sequences.push(record.seq().to_ascii_uppercase());
    }
    Ok(sequences)
}

/// Load a pairwise alignment FASTA: the first record is the reference, the
/// last record the consensus.
pub fn load_sequence_pair<P: AsRef<Path>>(path: P) -> Result<SequencePair> {
    let path = path.as_ref();
    let mut sequences = read_fasta_sequences(path)?;
    if sequences.len() < 2 {
        return Err(anyhow!(
            "alignment {} holds {} record(s), expected reference and consensus",
            path.display(),
            sequences.len()
        ));
    }
    let consensus = sequences.pop().unwrap_or_default();
    let reference = sequences.swap_remove(0);
    SequencePair::from_ascii(&reference, &consensus)
        .with_context(|| format!("alignment {} is not a valid pair", path.display()))
}

/// Build the reference base map from the first record of a FASTA file.
pub fn load_reference<P: AsRef<Path>>(path: P) -> Result<ReferenceBaseMap> {
    let path = path.as_ref();
    let sequences = read_fasta_sequences(path)?;
    let first = sequences
        .first()
        .ok_or_else(|| anyhow!("reference {} holds no records", path.display()))?;
    Ok(ReferenceBaseMap::from_sequence(first))
}

/// Read aligned reads from a tab-separated file.
///
/// Each line holds `name`, 0-based `start`, `CIGAR`, `SEQ` and `QUAL`
/// (Phred+33, or `*` when absent).
pub fn read_alignment_tsv<R: BufRead>(reader: R) -> Result<Vec<AlignedRead>> {
    let mut reads = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        let &[name, start, cigar, sequence, quality] = fields.as_slice() else {
            return Err(anyhow!(
                "expected 5 tab-separated fields on line {}, found {}",
                line_no + 1,
                fields.len()
            ));
        };

        let pos: u32 = start.parse().with_context(|| {
            format!("invalid start '{}' on line {}", start, line_no + 1)
        })?;
        let cigar = CigarOp::parse_cigar(cigar)
            .ok_or_else(|| anyhow!("invalid CIGAR '{}' on line {}", cigar, line_no + 1))?;
        let sequence = sequence.to_ascii_uppercase().into_bytes();
        let qualities = if quality == "*" {
            Vec::new()
        } else {
            if quality.len() != sequence.len() {
                return Err(anyhow!(
                    "quality length {} does not match sequence length {} on line {}",
                    quality.len(),
                    sequence.len(),
                    line_no + 1
                ));
            }
            quality.bytes().map(|q| q.saturating_sub(33)).collect()
        };

        reads.push(AlignedRead::new(name, pos, cigar, sequence, qualities));
    }

    Ok(reads)
}

pub use bam::scan_bam;

mod bam {
    use anyhow::{Context, Result};
    use rust_htslib::bam::{self, FetchDefinition, Read};
    use std::path::Path;
    use std::sync::Arc;

    use crate::genomics::{
        Base, PileupColumn, PileupEntry, PileupScan, PileupScanner, ReadEvent, ReferenceBaseMap,
    };
    use crate::AnalysisConfig;

    /// Scan the pileup of the first reference in an indexed BAM file in one
    /// pass.
    pub fn scan_bam<P: AsRef<Path>>(
        path: P,
        reference: &ReferenceBaseMap,
        targets: impl IntoIterator<Item = u32>,
        config: &AnalysisConfig,
    ) -> Result<PileupScan> {
        let path = path.as_ref();
        let mut reader = bam::IndexedReader::from_path(path)
            .with_context(|| format!("failed to open indexed BAM {}", path.display()))?;
        reader
            .fetch(FetchDefinition::CompleteTid(0))
            .with_context(|| format!("failed to fetch first reference of {}", path.display()))?;
        let mut scanner = PileupScanner::new(reference, targets);

        let mut pileups = reader.pileup();
        pileups.set_max_depth(config.max_depth);
        for pileup in pileups {
            let pileup = pileup.context("failed to read pileup column")?;

            let mut entries = Vec::new();
            for alignment in pileup.alignments() {
                let record = alignment.record();
                let event = if alignment.is_del() {
                    ReadEvent::Deletion
                } else if alignment.is_refskip() {
                    ReadEvent::RefSkip
                } else {
                    let Some(qpos) = alignment.qpos() else {
                        continue;
                    };
                    let quality = record.qual()[qpos];
                    if quality < config.min_base_quality {
                        continue;
                    }
                    ReadEvent::Base {
                        base: Base::from_ascii(record.seq()[qpos]),
                        quality,
                    }
                };
                entries.push(PileupEntry {
                    read_id: Arc::from(String::from_utf8_lossy(record.qname()).as_ref()),
                    event,
                });
            }

            scanner.consume(&PileupColumn {
                position: pileup.pos(),
                entries,
            })?;
        }

        Ok(scanner.finish())
    }

}
