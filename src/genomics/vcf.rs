use anyhow::{anyhow, Context, Result};
use rust_htslib::bcf::{self, Read};
use std::path::Path;

use tracing::{debug, warn};

use super::{Base, SnpAlleles, VariantDict, VariantSites};

/// Read substitution sites from a VCF or BCF file, plain or bgzipped.
///
/// A multi-base REF is split into one site per base
/// (`POS + i → REF[i], ALT[i]`) wherever the first ALT also has a base at
/// `i`. Missing and symbolic ALT alleles are ignored.
pub fn parse_vcf<P: AsRef<Path>>(path: P) -> Result<VariantDict> {
    let path = path.as_ref();
    let mut reader = bcf::Reader::from_path(path)
        .with_context(|| format!("failed to open VCF {}", path.display()))?;
    let mut sites = VariantDict::new();

    for (idx, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("invalid VCF record {} in {}", idx + 1, path.display()))?;
        let rid = record
            .rid()
            .ok_or_else(|| anyhow!("VCF record {} has no CHROM", idx + 1))?;
        let chrom = String::from_utf8_lossy(record.header().rid2name(rid)?).into_owned();
        let pos = u32::try_from(record.pos() + 1)
            .with_context(|| format!("POS of VCF record {} out of range", idx + 1))?;

        let alleles = record.alleles();
        let &[reference, alternate, ..] = alleles.as_slice() else {
            continue;
        };
        if alternate == b"." || alternate == b"*" || alternate.starts_with(b"<") {
            continue;
        }
        debug!(chrom = %chrom, pos, quality = record.qual(), "VCF record");

        insert_split_sites(sites.entry(chrom).or_default(), pos, reference, alternate);
    }

    Ok(sites)
}

fn insert_split_sites(sites: &mut VariantSites, pos: u32, reference: &[u8], alternate: &[u8]) {
    for (offset, (&ref_base, &alt_base)) in reference.iter().zip(alternate).enumerate() {
        let Some(position) = u32::try_from(offset)
            .ok()
            .and_then(|offset| pos.checked_add(offset))
        else {
            warn!(pos, offset, "split site past the coordinate range, skipped");
            break;
        };
        sites.insert(
            position,
            SnpAlleles {
                reference: Base::from_ascii(ref_base),
                alternate: Base::from_ascii(alt_base),
            },
        );
    }
}
