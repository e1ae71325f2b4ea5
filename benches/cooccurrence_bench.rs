//! Performance benchmarks

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use varlink::genomics::{Base, CooccurrenceAnalyzer, ReadAlleleMap, SnpAlleles, VariantSites};

const BASES: [Base; 4] = [Base::A, Base::C, Base::G, Base::T];

fn build_inputs(reads: usize, positions: u32) -> (VariantSites, ReadAlleleMap) {
    let sites: VariantSites = (0..positions)
        .map(|i| {
            let pos = 100 + i * 37;
            let reference = BASES[(i % 4) as usize];
            let alternate = BASES[((i + 1) % 4) as usize];
            (pos, SnpAlleles { reference, alternate })
        })
        .collect();

    let mut alleles = ReadAlleleMap::new();
    for read in 0..reads {
        let id: Arc<str> = Arc::from(format!("read{read}"));
        for (idx, (&pos, site)) in sites.iter().enumerate() {
            if (read + idx) % 5 == 0 {
                continue;
            }
            let base = if (read * 31 + idx) % 3 == 0 {
                site.alternate
            } else {
                site.reference
            };
            alleles.insert(Arc::clone(&id), pos, base);
        }
    }
    (sites, alleles)
}

fn benchmark_cooccurrence(c: &mut Criterion) {
    let (sites, alleles) = build_inputs(10_000, 40);

    c.bench_function("cooccurrence_reads=10000_sites=40", |b| {
        b.iter(|| {
            let table = CooccurrenceAnalyzer::new(&sites).analyze(black_box(&alleles));
            black_box(table.entries());
        });
    });
}

criterion_group!(benches, benchmark_cooccurrence);
criterion_main!(benches);
