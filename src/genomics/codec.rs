//! Compact variant strings and the per-sample variant report.
//!
//! Token grammar:
//!
//! ```text
//! SNP   := <pos>:<ref><alt>
//! INDEL := <pos>:(ins|del)<run length>
//! ```
//!
//! A report row is `barcode,reference,num_variants,token;token;...`.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, BufRead, Read, Write};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::genomics::{
    call_variants, Base, IndelKind, SequencePair, Variant, VariantKind,
};

/// Header of the aggregated variant report.
pub const REPORT_HEADER: [&str; 4] = ["barcode", "reference", "num_variants", "variants"];

/// Errors from encoding or decoding variant reports.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A token matches neither `pos:XY` nor `pos:{ins|del}N`.
    #[error("malformed variant token '{0}'")]
    MalformedVariantToken(String),
    /// The CSV layer rejected the input.
    #[error("invalid report CSV: {0}")]
    Csv(#[from] csv::Error),
    /// Reading or writing failed.
    #[error("report I/O failed: {0}")]
    Io(#[from] io::Error),
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            VariantKind::Snp {
                reference,
                alternate,
            } => write!(f, "{}:{}{}", self.position, reference, alternate),
            VariantKind::Insertion { length } => {
                write!(f, "{}:{}{}", self.position, IndelKind::Insertion.prefix(), length)
            }
            VariantKind::Deletion { length } => {
                write!(f, "{}:{}{}", self.position, IndelKind::Deletion.prefix(), length)
            }
        }
    }
}

impl FromStr for Variant {
    type Err = CodecError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let malformed = || CodecError::MalformedVariantToken(token.to_string());

        let (position, payload) = token.split_once(':').ok_or_else(malformed)?;
        let position: u32 = position.parse().map_err(|_| malformed())?;

        for kind in [IndelKind::Insertion, IndelKind::Deletion] {
            if let Some(length) = payload.strip_prefix(kind.prefix()) {
                if !length.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(malformed());
                }
                let length: u32 = length.parse().map_err(|_| malformed())?;
                if length == 0 {
                    return Err(malformed());
                }
                return Ok(Variant::indel(position, kind, length));
            }
        }

        match payload.as_bytes() {
            [reference, alternate] => {
                let reference = Base::try_from_ascii(*reference).ok_or_else(malformed)?;
                let alternate = Base::try_from_ascii(*alternate).ok_or_else(malformed)?;
                Ok(Variant::snp(position, reference, alternate))
            }
            _ => Err(malformed()),
        }
    }
}

/// Parse a `;`-joined variant string. An empty string holds no variants.
pub fn parse_variant_string(variants: &str) -> Result<Vec<Variant>, CodecError> {
    if variants.is_empty() {
        return Ok(Vec::new());
    }
    variants.split(';').map(str::parse).collect()
}

/// Join variants into the compact `;`-separated string.
pub fn format_variant_string(variants: &[Variant]) -> String {
    variants
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

/// One row of the variant report for a single sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRecord {
    /// Sample barcode.
    pub barcode: String,
    /// Reference the consensus was aligned against.
    pub reference_name: String,
    /// Variants in ascending position order.
    pub variants: Vec<Variant>,
}

impl VariantRecord {
    /// Call variants for an aligned pair and wrap them as a report row.
    pub fn from_pair(
        barcode: impl Into<String>,
        reference_name: impl Into<String>,
        pair: &SequencePair,
    ) -> Self {
        Self {
            barcode: barcode.into(),
            reference_name: reference_name.into(),
            variants: call_variants(pair),
        }
    }

    /// Number of variants in the row.
    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    /// The `;`-joined variant tokens.
    pub fn variant_string(&self) -> String {
        format_variant_string(&self.variants)
    }

    /// Report line including the trailing newline.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }

    /// Write the headerless report line.
    pub fn write_line<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.to_line().as_bytes())
    }
}

impl fmt::Display for VariantRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.barcode,
            self.reference_name,
            self.variant_count(),
            self.variant_string()
        )
    }
}

/// Reference and alternate base of a substitution site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnpAlleles {
    /// Reference base.
    pub reference: Base,
    /// Alternate base.
    pub alternate: Base,
}

/// Substitution sites of one reference, keyed by 1-based position.
pub type VariantSites = BTreeMap<u32, SnpAlleles>;

/// Substitution sites for every reference, keyed by reference name.
pub type VariantDict = BTreeMap<String, VariantSites>;

/// A report row that could not be decoded.
#[derive(Debug)]
pub struct RejectedRecord {
    /// 1-based data row number (header excluded).
    pub row: usize,
    /// Why it was rejected.
    pub error: CodecError,
}

/// Sites recovered from a variant report.
#[derive(Debug, Default)]
pub struct ParsedReport {
    /// Substitution sites per reference.
    pub sites: VariantDict,
    /// Rows skipped because of malformed tokens or missing fields.
    pub rejected: Vec<RejectedRecord>,
}

impl ParsedReport {
    fn reject(&mut self, row: usize, error: CodecError) {
        warn!(row, %error, "skipping variant report row");
        self.rejected.push(RejectedRecord { row, error });
    }
}

#[derive(Debug, Deserialize)]
struct ReportRow {
    reference: String,
    variants: String,
}

/// Rebuild the per-reference substitution sites from a variant report.
///
/// Indel tokens are accepted but do not contribute sites. A row with a
/// malformed token or too few fields is rejected as a whole while the other
/// rows still count. Only I/O failures abort the parse.
pub fn parse_variant_report<R: Read>(reader: R) -> Result<ParsedReport, CodecError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut parsed = ParsedReport::default();

    for (idx, row) in csv_reader.deserialize::<ReportRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(error) if error.is_io_error() => return Err(error.into()),
            Err(error) => {
                parsed.reject(idx + 1, error.into());
                continue;
            }
        };
        match parse_variant_string(&row.variants) {
            Ok(variants) => {
                let sites = parsed.sites.entry(row.reference).or_default();
                for variant in variants {
                    if let Some((reference, alternate)) = variant.snp_alleles() {
                        sites.insert(
                            variant.position,
                            SnpAlleles {
                                reference,
                                alternate,
                            },
                        );
                    }
                }
            }
            Err(error) => parsed.reject(idx + 1, error),
        }
    }

    Ok(parsed)
}

/// Concatenate headerless per-sample reports under a single header line.
pub fn join_variant_reports<R, W>(
    header_fields: &[&str],
    inputs: impl IntoIterator<Item = R>,
    output: &mut W,
) -> io::Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(output, "{}", header_fields.join(","))?;
    for input in inputs {
        for line in input.lines() {
            let line = line?;
            writeln!(output, "{}", line.trim_end_matches('\r'))?;
        }
    }
    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("12:AG", Variant::snp(12, Base::A, Base::G) ; "snp")]
    #[test_case("3:del1", Variant::indel(3, IndelKind::Deletion, 1) ; "deletion")]
    #[test_case("40:ins12", Variant::indel(40, IndelKind::Insertion, 12) ; "insertion")]
    #[test_case("7:cn", Variant::snp(7, Base::C, Base::N) ; "lowercase snp")]
    fn parses_tokens(token: &str, expected: Variant) {
        assert_eq!(token.parse::<Variant>().unwrap(), expected);
    }

    #[test_case("12" ; "missing colon")]
    #[test_case("x:AG" ; "bad position")]
    #[test_case("12:A" ; "one base")]
    #[test_case("12:AGT" ; "three bases")]
    #[test_case("12:AZ" ; "unknown base")]
    #[test_case("12:ins" ; "indel without length")]
    #[test_case("12:del0" ; "zero length")]
    #[test_case("12:del+3" ; "signed length")]
    #[test_case("12:dup2" ; "unknown indel kind")]
    #[test_case("" ; "empty token")]
    fn rejects_malformed_tokens(token: &str) {
        assert!(matches!(
            token.parse::<Variant>(),
            Err(CodecError::MalformedVariantToken(t)) if t == token
        ));
    }

    #[test]
    fn record_line_format() {
        let pair = SequencePair::from_ascii(b"ATGCATGC", b"AT-CATGT").unwrap();
        let record = VariantRecord::from_pair("barcode01", "Sabin1", &pair);
        assert_eq!(record.variant_count(), 2);
        assert_eq!(record.variant_string(), "3:del1;8:CT");
        assert_eq!(record.to_line(), "barcode01,Sabin1,2,3:del1;8:CT\n");
    }

    #[test]
    fn record_without_variants() {
        let pair = SequencePair::from_ascii(b"ACGT", b"ACGT").unwrap();
        let record = VariantRecord::from_pair("b", "ref", &pair);
        assert_eq!(record.to_line(), "b,ref,0,\n");
        assert!(parse_variant_string("").unwrap().is_empty());
    }

    #[test]
    fn report_parsing_keeps_good_rows() {
        let report = "barcode,reference,num_variants,variants\n\
                      b1,refA,3,3:del1;8:CT;20:GA\n\
                      b2,refA,1,9:Q\n\
                      b3,refB,0,\n\
                      b4,refB,1,5:AC\n";
        let parsed = parse_variant_report(report.as_bytes()).unwrap();

        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.rejected[0].row, 2);

        let ref_a = &parsed.sites["refA"];
        assert_eq!(ref_a.len(), 2);
        assert_eq!(
            ref_a[&8],
            SnpAlleles {
                reference: Base::C,
                alternate: Base::T
            }
        );
        assert!(!ref_a.contains_key(&3));
        assert_eq!(parsed.sites["refB"].len(), 1);
    }

    #[test]
    fn truncated_row_is_rejected_alone() {
        let report = "barcode,reference,num_variants,variants\n\
                      b1,refA,1,3:CT\n\
                      b2,refA,1\n\
                      b3,refA,1,9:GA\n";
        let parsed = parse_variant_report(report.as_bytes()).unwrap();

        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.rejected[0].row, 2);
        assert!(matches!(parsed.rejected[0].error, CodecError::Csv(_)));
        assert_eq!(
            parsed.sites["refA"].keys().copied().collect::<Vec<_>>(),
            vec![3, 9]
        );
    }

    #[test]
    fn join_writes_header_once() {
        let first = "b1,ref,1,4:CT\n";
        let second = "b2,ref,0,\r\nb3,ref,1,2:del1";
        let mut output = Vec::new();
        join_variant_reports(
            &REPORT_HEADER,
            [first.as_bytes(), second.as_bytes()],
            &mut output,
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "barcode,reference,num_variants,variants\nb1,ref,1,4:CT\nb2,ref,0,\nb3,ref,1,2:del1\n"
        );
    }
}
