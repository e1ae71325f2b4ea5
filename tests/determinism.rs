mod common;

use std::collections::HashSet;

use blake3::hash;
use common::read;
use varlink::genomics::{
    write_cooccurrence_json, Base, CooccurrenceAnalyzer, PileupScanner, ReadPileup,
    ReferenceBaseMap, SnpAlleles, VariantSites,
};
use varlink::AnalysisConfig;

#[test]
fn cooccurrence_output_is_deterministic() {
    let reference = ReferenceBaseMap::from_sequence(b"ACGTACGTACGTACGT");
    let sites: VariantSites = [
        (2, SnpAlleles { reference: Base::C, alternate: Base::T }),
        (6, SnpAlleles { reference: Base::C, alternate: Base::A }),
        (11, SnpAlleles { reference: Base::G, alternate: Base::C }),
    ]
    .into_iter()
    .collect();

    let mut fingerprints = HashSet::new();
    for round in 0..5 {
        let mut reads = vec![
            read("a", 0, "12M", "ATGTAAGTACCT", 30),
            read("b", 1, "5M2D5M", "TGTAGTACCT", 30),
            read("c", 4, "8M", "ACGTACGT", 30),
            read("d", 0, "3M1I5M", "ACGGTACGT", 30),
        ];
        let len = reads.len();
        reads.rotate_left(round % len);

        let scan = PileupScanner::new(&reference, sites.keys().copied())
            .scan(ReadPileup::new(reads, &AnalysisConfig::default()))
            .expect("scan succeeds");
        let entries = CooccurrenceAnalyzer::new(&sites)
            .analyze(&scan.read_alleles)
            .entries();

        let mut json = Vec::new();
        write_cooccurrence_json(&mut json, &entries).expect("rendering succeeds");
        fingerprints.insert(hash(&json));
    }

    assert_eq!(fingerprints.len(), 1, "outputs diverged across runs");
}
