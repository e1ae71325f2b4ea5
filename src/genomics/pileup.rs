use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::genomics::{
    non_ref_percent, AlignedRead, Base, CigarOpKind, ReadAlleleExtractor, ReadAlleleMap,
    ReferenceBaseMap,
};
use crate::AnalysisConfig;

/// Errors raised while turning pileup columns into per-position records.
#[derive(Debug, Error)]
pub enum PileupError {
    /// The reference map has no base at a pileup offset (0-based).
    #[error("no reference base at offset {0}; alignment and reference disagree")]
    UnknownReferenceBase(u32),
}

/// What a single read shows at one reference position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEvent {
    /// An aligned base together with its Phred quality.
    Base {
        /// Called base.
        base: Base,
        /// Phred base quality.
        quality: u8,
    },
    /// The read carries a deletion here.
    Deletion,
    /// The read skips this reference region (spliced alignment).
    RefSkip,
}

/// One read's contribution to a pileup column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PileupEntry {
    /// Read name.
    pub read_id: Arc<str>,
    /// Observation at the column.
    pub event: ReadEvent,
}

/// All quality-passing read observations at one reference position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PileupColumn {
    /// 0-based reference coordinate.
    pub position: u32,
    /// Observations, one per overlapping read.
    pub entries: Vec<PileupEntry>,
}

/// Per-base observation counts for one column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaseCounts {
    /// Reads showing `A`.
    pub a: u32,
    /// Reads showing `C`.
    pub c: u32,
    /// Reads showing `G`.
    pub g: u32,
    /// Reads showing `T`.
    pub t: u32,
    /// Reads with a deletion or reference skip.
    pub gap: u32,
}

impl BaseCounts {
    /// Tally a column. `N` calls are not counted anywhere.
    pub fn from_column(column: &PileupColumn) -> Self {
        let mut counts = Self::default();
        for entry in &column.entries {
            match entry.event {
                ReadEvent::Base { base, .. } => match base {
                    Base::A => counts.a += 1,
                    Base::C => counts.c += 1,
                    Base::G => counts.g += 1,
                    Base::T => counts.t += 1,
                    Base::N | Base::Gap => {}
                },
                ReadEvent::Deletion | ReadEvent::RefSkip => counts.gap += 1,
            }
        }
        counts
    }

    /// Count for a single symbol.
    pub fn count(&self, base: Base) -> u32 {
        match base {
            Base::A => self.a,
            Base::C => self.c,
            Base::G => self.g,
            Base::T => self.t,
            Base::Gap => self.gap,
            Base::N => 0,
        }
    }

    /// Sum over all counted symbols including gaps.
    pub fn total(&self) -> u32 {
        self.a + self.c + self.g + self.t + self.gap
    }
}

/// Summary of one genomic position of the pileup.
#[derive(Debug, Clone, PartialEq)]
pub struct PileupRecord {
    /// 1-based reference position.
    pub position: u32,
    /// Observation counts.
    pub base_counts: BaseCounts,
    /// Reference base at the position.
    pub reference_base: Base,
    /// Percentage of reads not supporting the reference, in `[0, 100]`.
    pub non_ref_percent: f64,
}

#[derive(Debug, Serialize)]
struct PileupRow {
    #[serde(rename = "Position")]
    position: u32,
    #[serde(rename = "A reads")]
    a: u32,
    #[serde(rename = "C reads")]
    c: u32,
    #[serde(rename = "T reads")]
    t: u32,
    #[serde(rename = "G reads")]
    g: u32,
    #[serde(rename = "- reads")]
    gap: u32,
    #[serde(rename = "Percentage")]
    percentage: f64,
    #[serde(rename = "Ref base")]
    reference_base: char,
}

impl From<&PileupRecord> for PileupRow {
    fn from(record: &PileupRecord) -> Self {
        Self {
            position: record.position,
            a: record.base_counts.a,
            c: record.base_counts.c,
            t: record.base_counts.t,
            g: record.base_counts.g,
            gap: record.base_counts.gap,
            percentage: record.non_ref_percent,
            reference_base: record.reference_base.as_char(),
        }
    }
}

/// Write pileup records as a CSV table with a header row.
pub fn write_pileup_csv<W: Write>(writer: W, records: &[PileupRecord]) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(PileupRow::from(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Turns pileup columns into [`PileupRecord`]s against one reference.
#[derive(Debug, Clone, Copy)]
pub struct PileupAggregator<'a> {
    reference: &'a ReferenceBaseMap,
}

impl<'a> PileupAggregator<'a> {
    /// Aggregate against the given reference base map.
    pub fn new(reference: &'a ReferenceBaseMap) -> Self {
        Self { reference }
    }

    /// Build the record for a column.
    pub fn aggregate(&self, column: &PileupColumn) -> Result<PileupRecord, PileupError> {
        self.record_from_counts(column.position, BaseCounts::from_column(column))
    }

    /// Build the record from counts already tallied for a 0-based position.
    pub fn record_from_counts(
        &self,
        position: u32,
        base_counts: BaseCounts,
    ) -> Result<PileupRecord, PileupError> {
        let reference_base = self.reference.base_at(position)?;
        let non_ref_percent = non_ref_percent(
            reference_base,
            base_counts.count(reference_base),
            base_counts.total(),
        );
        Ok(PileupRecord {
            position: position + 1,
            base_counts,
            reference_base,
            non_ref_percent,
        })
    }
}

/// Output of one pass over a pileup.
#[derive(Debug, Clone)]
pub struct PileupScan {
    /// One record per covered position, in scan order.
    pub records: Vec<PileupRecord>,
    /// Per-read alleles at the target positions.
    pub read_alleles: ReadAlleleMap,
}

/// Single-pass consumer of pileup columns.
///
/// Every column yields a [`PileupRecord`]; columns at target positions also
/// feed the per-read allele map.
#[derive(Debug)]
pub struct PileupScanner<'a> {
    aggregator: PileupAggregator<'a>,
    extractor: ReadAlleleExtractor,
    records: Vec<PileupRecord>,
}

impl<'a> PileupScanner<'a> {
    /// Create a scanner for the given reference and 1-based target positions.
    pub fn new(reference: &'a ReferenceBaseMap, targets: impl IntoIterator<Item = u32>) -> Self {
        Self {
            aggregator: PileupAggregator::new(reference),
            extractor: ReadAlleleExtractor::new(targets),
            records: Vec::new(),
        }
    }

    /// Process one column.
    pub fn consume(&mut self, column: &PileupColumn) -> Result<(), PileupError> {
        let record = self.aggregator.aggregate(column)?;
        self.extractor.observe(column);
        self.records.push(record);
        Ok(())
    }

    /// Consume every column from `columns` and finish.
    pub fn scan<I>(mut self, columns: I) -> Result<PileupScan, PileupError>
    where
        I: IntoIterator<Item = PileupColumn>,
    {
        for column in columns {
            self.consume(&column)?;
        }
        Ok(self.finish())
    }

    /// Finalise the scan.
    pub fn finish(self) -> PileupScan {
        let read_alleles = self.extractor.finish();
        info!(
            positions = self.records.len(),
            reads = read_alleles.len(),
            "pileup scan complete"
        );
        PileupScan {
            records: self.records,
            read_alleles,
        }
    }
}

/// Walks a read's CIGAR one reference position at a time.
#[derive(Debug, Clone)]
struct ReadCursor {
    op_idx: usize,
    op_offset: u32,
    ref_pos: u32,
    query_pos: usize,
}

impl ReadCursor {
    fn new(read: &AlignedRead) -> Self {
        Self {
            op_idx: 0,
            op_offset: 0,
            ref_pos: read.pos,
            query_pos: 0,
        }
    }

    fn advance(&mut self, read: &AlignedRead) -> Option<(u32, ReadEvent)> {
        while let Some(op) = read.cigar.get(self.op_idx) {
            if self.op_offset >= op.len {
                self.op_idx += 1;
                self.op_offset = 0;
                continue;
            }

            let position = self.ref_pos;
            let event = match op.kind {
                CigarOpKind::Match => {
                    let base = read.base_at(self.query_pos)?;
                    let quality = read.quality_at(self.query_pos).unwrap_or(u8::MAX);
                    self.query_pos += 1;
                    ReadEvent::Base {
                        base: Base::from_ascii(base),
                        quality,
                    }
                }
                CigarOpKind::Deletion => ReadEvent::Deletion,
                CigarOpKind::RefSkip => ReadEvent::RefSkip,
                kind => {
                    if kind.consumes_query() {
                        self.query_pos += (op.len - self.op_offset) as usize;
                    }
                    self.op_offset = op.len;
                    continue;
                }
            };

            self.op_offset += 1;
            self.ref_pos += 1;
            return Some((position, event));
        }
        None
    }
}

#[derive(Debug)]
struct ActiveRead {
    read: AlignedRead,
    cursor: ReadCursor,
    next: Option<(u32, ReadEvent)>,
}

/// Streaming pileup over in-memory aligned reads.
///
/// Columns are produced in ascending position order for every covered
/// position; only reads overlapping the current position are kept active.
/// Bases below the configured minimum quality are left out of the column.
#[derive(Debug)]
pub struct ReadPileup {
    pending: VecDeque<AlignedRead>,
    active: Vec<ActiveRead>,
    position: u32,
    min_base_quality: u8,
    max_depth: usize,
}

impl ReadPileup {
    /// Build a pileup from reads in any order.
    pub fn new(mut reads: Vec<AlignedRead>, config: &AnalysisConfig) -> Self {
        reads.sort_by_key(|read| read.pos);
        Self {
            pending: reads.into(),
            active: Vec::new(),
            position: 0,
            min_base_quality: config.min_base_quality,
            max_depth: config.max_depth as usize,
        }
    }

    fn activate_pending(&mut self) {
        while let Some(read) = self.pending.front() {
            if read.pos > self.position {
                break;
            }
            let Some(read) = self.pending.pop_front() else {
                break;
            };
            if self.active.len() >= self.max_depth {
                debug!(read = %read.name, position = self.position, "max depth reached, skipping read");
                continue;
            }
            let mut cursor = ReadCursor::new(&read);
            if let Some(next) = cursor.advance(&read) {
                self.active.push(ActiveRead {
                    read,
                    cursor,
                    next: Some(next),
                });
            }
        }
    }
}

impl Iterator for ReadPileup {
    type Item = PileupColumn;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.active.is_empty() {
                let start = self.pending.front()?.pos;
                self.position = self.position.max(start);
            }
            self.activate_pending();
            if self.active.is_empty() {
                continue;
            }

            let position = self.position;
            let min_base_quality = self.min_base_quality;
            let mut entries = Vec::with_capacity(self.active.len());
            self.active.retain_mut(|active| match active.next {
                Some((pos, event)) if pos == position => {
                    let passes = match event {
                        ReadEvent::Base { quality, .. } => quality >= min_base_quality,
                        ReadEvent::Deletion | ReadEvent::RefSkip => true,
                    };
                    if passes {
                        entries.push(PileupEntry {
                            read_id: Arc::clone(&active.read.name),
                            event,
                        });
                    }
                    active.next = active.cursor.advance(&active.read);
                    active.next.is_some()
                }
                Some(_) => true,
                None => false,
            });

            self.position += 1;
            return Some(PileupColumn { position, entries });
        }
    }
}
