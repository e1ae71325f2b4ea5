mod common;

use common::{assert_snapshot, read};
use varlink::genomics::{
    join_variant_reports, write_cooccurrence_json, write_pileup_csv, Base, CooccurrenceAnalyzer,
    PileupScanner, ReadPileup, ReferenceBaseMap, SequencePair, SnpAlleles, VariantRecord,
    VariantSites, REPORT_HEADER,
};
use varlink::AnalysisConfig;

fn sites() -> VariantSites {
    [
        (3, SnpAlleles { reference: Base::G, alternate: Base::A }),
        (7, SnpAlleles { reference: Base::G, alternate: Base::T }),
    ]
    .into_iter()
    .collect()
}

fn scan() -> varlink::genomics::PileupScan {
    let reference = ReferenceBaseMap::from_sequence(b"ACGTACGTAC");
    let reads = vec![
        read("r1", 0, "10M", "ACATACTTAC", 30),
        read("r2", 0, "10M", "ACATACTTAC", 30),
        read("r3", 0, "10M", "ACGTACGTAC", 30),
        read("r4", 2, "2M1D5M", "GTCGTAC", 30),
        read("r5", 4, "6M", "ACTTAC", 30),
        read("r6", 0, "4M", "ACCT", 5),
    ];
    PileupScanner::new(&reference, sites().keys().copied())
        .scan(ReadPileup::new(reads, &AnalysisConfig::default()))
        .expect("scan succeeds")
}

#[test]
fn joined_report_matches_golden() {
    let samples = [
        ("barcode01", b"ATGCATGC".as_slice(), b"AT-CATGT".as_slice()),
        ("barcode02", b"A--CGTACG".as_slice(), b"ATTAG--CC".as_slice()),
        ("barcode03", b"ACGTACGT".as_slice(), b"ACGTNCGT".as_slice()),
    ];
    let lines: Vec<String> = samples
        .iter()
        .map(|(barcode, reference, consensus)| {
            let pair = SequencePair::from_ascii(reference, consensus).expect("equal lengths");
            VariantRecord::from_pair(*barcode, "Sabin1", &pair).to_line()
        })
        .collect();

    let mut output = Vec::new();
    join_variant_reports(&REPORT_HEADER, lines.iter().map(|l| l.as_bytes()), &mut output)
        .expect("join succeeds");
    assert_snapshot("report/joined.csv", &String::from_utf8(output).unwrap());
}

#[test]
fn pileup_table_matches_golden() {
    let mut output = Vec::new();
    write_pileup_csv(&mut output, &scan().records).expect("csv rendering succeeds");
    assert_snapshot("pileup/linked.csv", &String::from_utf8(output).unwrap());
}

#[test]
fn cooccurrence_json_matches_golden() {
    let sites = sites();
    let entries = CooccurrenceAnalyzer::new(&sites)
        .analyze(&scan().read_alleles)
        .entries();
    let mut output = Vec::new();
    write_cooccurrence_json(&mut output, &entries).expect("json rendering succeeds");
    output.push(b'\n');
    assert_snapshot("cooccurrence/linked.json", &String::from_utf8(output).unwrap());
}
