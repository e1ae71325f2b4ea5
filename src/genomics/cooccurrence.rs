//! Pairwise allele co-occurrence across reads.
//!
//! Each variant position gets two indicator columns over the reads: one bit
//! per read for "shows the reference allele" and one for "shows the
//! alternate allele". The co-occurrence counts are the self inner products
//! of those column sets, so `count(p1, p2)` is the number of reads carrying
//! the allele at both positions.

use std::io::Write;

use bitvec::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::genomics::{round_to, ReadAlleleMap, VariantSites};

/// Reads × positions binary matrix stored as one bit column per position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorMatrix {
    columns: Vec<BitVec<u64, Lsb0>>,
}

impl IndicatorMatrix {
    /// All-zero matrix.
    pub fn zeros(rows: usize, columns: usize) -> Self {
        Self {
            columns: vec![bitvec![u64, Lsb0; 0; rows]; columns],
        }
    }

    /// Set the bit for `row` in `column`.
    pub fn set(&mut self, row: usize, column: usize) {
        self.columns[column].set(row, true);
    }

    /// `Mᵀ·M`: for every column pair, the number of rows set in both.
    pub fn self_product(&self) -> CountMatrix {
        let dim = self.columns.len();
        let mut product = CountMatrix::zeros(dim);
        for i in 0..dim {
            for j in i..dim {
                let right = &self.columns[j];
                let shared = self.columns[i].iter_ones().filter(|&row| right[row]).count() as u32;
                product.set(i, j, shared);
                product.set(j, i, shared);
            }
        }
        product
    }
}

/// Dense square matrix of pair counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountMatrix {
    dim: usize,
    values: Vec<u32>,
}

impl CountMatrix {
    fn zeros(dim: usize) -> Self {
        Self {
            dim,
            values: vec![0; dim * dim],
        }
    }

    fn set(&mut self, row: usize, column: usize, value: u32) {
        self.values[row * self.dim + column] = value;
    }

    /// Count at `(row, column)`.
    pub fn get(&self, row: usize, column: usize) -> u32 {
        self.values[row * self.dim + column]
    }
}

/// Co-occurrence of two variant positions across reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CooccurrenceEntry {
    /// First position (row).
    #[serde(rename = "SNP1")]
    pub pos1: u32,
    /// Second position (column).
    #[serde(rename = "SNP2")]
    pub pos2: u32,
    /// Reads showing the reference allele at both positions.
    #[serde(rename = "Ref")]
    pub ref_count: u32,
    /// Reads showing the alternate allele at both positions.
    #[serde(rename = "Alt")]
    pub alt_count: u32,
    /// Reads with any call at `pos1`.
    #[serde(rename = "Total")]
    pub total: u32,
    /// `alt_count` as a whole percentage of `total`.
    #[serde(rename = "PcentAlt")]
    pub pct_alt: f64,
    /// `ref_count` as a whole percentage of `total`.
    #[serde(rename = "PcentRef")]
    pub pct_ref: f64,
}

/// Raw co-occurrence counts for a set of variant positions.
#[derive(Debug, Clone)]
pub struct CooccurrenceTable {
    positions: Vec<u32>,
    totals: Vec<u32>,
    ref_counts: CountMatrix,
    alt_counts: CountMatrix,
}

impl CooccurrenceTable {
    /// Positions in ascending order.
    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    fn index_of(&self, position: u32) -> Option<usize> {
        self.positions.binary_search(&position).ok()
    }

    /// Reads with any call at `position`.
    pub fn total(&self, position: u32) -> Option<u32> {
        Some(self.totals[self.index_of(position)?])
    }

    /// Reads showing the reference allele at both positions.
    pub fn ref_count(&self, pos1: u32, pos2: u32) -> Option<u32> {
        Some(self.ref_counts.get(self.index_of(pos1)?, self.index_of(pos2)?))
    }

    /// Reads showing the alternate allele at both positions.
    pub fn alt_count(&self, pos1: u32, pos2: u32) -> Option<u32> {
        Some(self.alt_counts.get(self.index_of(pos1)?, self.index_of(pos2)?))
    }

    /// Every ordered position pair, `pos1`-major.
    ///
    /// Percentages are normalised by the read total at `pos1` only, so they
    /// are not symmetric even though the counts are. A zero total gives 0.
    pub fn entries(&self) -> Vec<CooccurrenceEntry> {
        let dim = self.positions.len();
        let mut entries = Vec::with_capacity(dim * dim);
        for (i, &pos1) in self.positions.iter().enumerate() {
            let total = self.totals[i];
            for (j, &pos2) in self.positions.iter().enumerate() {
                let ref_count = self.ref_counts.get(i, j);
                let alt_count = self.alt_counts.get(i, j);
                entries.push(CooccurrenceEntry {
                    pos1,
                    pos2,
                    ref_count,
                    alt_count,
                    total,
                    pct_alt: percent(alt_count, total),
                    pct_ref: percent(ref_count, total),
                });
            }
        }
        entries
    }
}

fn percent(count: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(100.0 * (count as f64 / total as f64), 0)
}

/// Builds co-occurrence tables from per-read alleles at known sites.
#[derive(Debug, Clone, Copy)]
pub struct CooccurrenceAnalyzer<'a> {
    sites: &'a VariantSites,
}

impl<'a> CooccurrenceAnalyzer<'a> {
    /// Analyse the given substitution sites.
    pub fn new(sites: &'a VariantSites) -> Self {
        Self { sites }
    }

    /// Build the indicator matrices and their self products.
    pub fn analyze(&self, reads: &ReadAlleleMap) -> CooccurrenceTable {
        let positions: Vec<u32> = self.sites.keys().copied().collect();
        let mut refs = IndicatorMatrix::zeros(reads.len(), positions.len());
        let mut alts = IndicatorMatrix::zeros(reads.len(), positions.len());
        let mut totals = vec![0u32; positions.len()];

        for (row, (_, alleles)) in reads.iter().enumerate() {
            for (column, (position, site)) in self.sites.iter().enumerate() {
                let Some(&observed) = alleles.get(position) else {
                    continue;
                };
                totals[column] += 1;
                if observed == site.reference {
                    refs.set(row, column);
                } else if observed == site.alternate {
                    alts.set(row, column);
                }
            }
        }

        debug!(
            reads = reads.len(),
            positions = positions.len(),
            "building co-occurrence matrices"
        );

        CooccurrenceTable {
            positions,
            totals,
            ref_counts: refs.self_product(),
            alt_counts: alts.self_product(),
        }
    }
}

/// Write co-occurrence entries as a JSON array of records.
pub fn write_cooccurrence_json<W: Write>(
    writer: W,
    entries: &[CooccurrenceEntry],
) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(writer, entries)
}
