use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use varlink::genomics::{
    ambiguity_percent, join_variant_reports, load_reference, load_sequence_pair,
    parse_variant_report, parse_vcf, read_alignment_tsv, scan_bam, write_cooccurrence_json,
    write_pileup_csv, CooccurrenceAnalyzer, PileupScan, PileupScanner, ReadPileup,
    VariantRecord, VariantSites, REPORT_HEADER,
};
use varlink::{AnalysisConfig, DEFAULT_MAX_DEPTH, DEFAULT_MIN_BASE_QUALITY};

#[derive(Parser, Debug)]
#[command(
    name = "varlink",
    about = "Consensus variant calling and read-level allele co-occurrence"
)]
struct Cli {
    /// Log debug output (RUST_LOG takes precedence).
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Call variants from a reference/consensus alignment FASTA.
    Variants {
        /// Alignment FASTA (reference first, consensus last).
        alignment: PathBuf,
        /// Sample barcode written to the report.
        #[arg(long)]
        barcode: String,
        /// Reference name written to the report.
        #[arg(long)]
        reference_name: String,
        /// Write the report line here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Join headerless per-sample reports into one report.
    Join {
        /// Per-sample report files.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Write the joined report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Summarise a pileup and compute allele co-occurrence at known sites.
    Cooccurrence(CooccurrenceArgs),
}

#[derive(Args, Debug)]
struct CooccurrenceArgs {
    /// Reference FASTA (first record is used).
    #[arg(long)]
    reference: PathBuf,
    /// Aligned reads (`name<TAB>start<TAB>CIGAR<TAB>SEQ<TAB>QUAL`).
    #[arg(long, conflicts_with = "bam", required_unless_present = "bam")]
    reads: Option<PathBuf>,
    /// Coordinate-sorted, indexed BAM file (first reference is scanned).
    #[arg(long)]
    bam: Option<PathBuf>,
    /// Variant report providing the sites.
    #[arg(long, conflicts_with = "vcf", required_unless_present = "vcf")]
    report: Option<PathBuf>,
    /// VCF or BCF (plain or bgzipped) providing the sites.
    #[arg(long)]
    vcf: Option<PathBuf>,
    /// Reference name to select sites for.
    #[arg(long)]
    reference_name: String,
    /// Minimum base quality for pileup observations.
    #[arg(long, default_value_t = DEFAULT_MIN_BASE_QUALITY)]
    min_base_quality: u8,
    /// Maximum reads per pileup column.
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: u32,
    /// Write the per-position pileup table (CSV) here.
    #[arg(long)]
    pileup_out: Option<PathBuf>,
    /// Write co-occurrence records (JSON) here instead of stdout.
    #[arg(long)]
    json_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Variants {
            alignment,
            barcode,
            reference_name,
            output,
        } => run_variants(alignment, barcode, reference_name, output)?,
        Commands::Join { inputs, output } => run_join(inputs, output)?,
        Commands::Cooccurrence(args) => run_cooccurrence(args)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("failed to create output {}", path.display())
        })?)),
        None => Box::new(io::stdout().lock()),
    })
}

fn run_variants(
    alignment: PathBuf,
    barcode: String,
    reference_name: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let pair = load_sequence_pair(&alignment)?;
    info!(
        barcode = %barcode,
        ambiguity_pct = ambiguity_percent(pair.consensus()),
        "consensus loaded"
    );

    let record = VariantRecord::from_pair(barcode, reference_name, &pair);
    info!(variants = record.variant_count(), "variants called");

    let mut writer = open_output(output.as_ref())?;
    record.write_line(&mut writer)?;
    writer.flush()?;
    Ok(())
}

fn run_join(inputs: Vec<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let readers = inputs
        .iter()
        .map(|path| {
            File::open(path)
                .map(BufReader::new)
                .with_context(|| format!("failed to open report {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut writer = open_output(output.as_ref())?;
    join_variant_reports(&REPORT_HEADER, readers, &mut writer)?;
    Ok(())
}

fn load_sites(args: &CooccurrenceArgs) -> Result<VariantSites> {
    let mut sites = if let Some(path) = &args.report {
        let file = File::open(path)
            .with_context(|| format!("failed to open report {}", path.display()))?;
        let parsed = parse_variant_report(file)?;
        if !parsed.rejected.is_empty() {
            warn!(rejected = parsed.rejected.len(), "some report rows were skipped");
        }
        parsed.sites
    } else if let Some(path) = &args.vcf {
        parse_vcf(path)?
    } else {
        return Err(anyhow!("either --report or --vcf is required"));
    };

    Ok(sites.remove(&args.reference_name).unwrap_or_else(|| {
        warn!(reference = %args.reference_name, "no sites for reference");
        VariantSites::new()
    }))
}

fn scan(args: &CooccurrenceArgs, sites: &VariantSites, config: &AnalysisConfig) -> Result<PileupScan> {
    let reference = load_reference(&args.reference)?;
    let targets = sites.keys().copied();

    if let Some(path) = &args.reads {
        let file =
            File::open(path).with_context(|| format!("failed to open reads {}", path.display()))?;
        let reads = read_alignment_tsv(BufReader::new(file))?;
        let pileup = ReadPileup::new(reads, config);
        return Ok(PileupScanner::new(&reference, targets).scan(pileup)?);
    }

    let Some(path) = &args.bam else {
        return Err(anyhow!("either --reads or --bam is required"));
    };
    scan_bam(path, &reference, targets, config)
}

fn run_cooccurrence(args: CooccurrenceArgs) -> Result<()> {
    let config = AnalysisConfig::default()
        .with_min_base_quality(args.min_base_quality)
        .with_max_depth(args.max_depth);

    let sites = load_sites(&args)?;
    let scan = scan(&args, &sites, &config)?;

    if let Some(path) = &args.pileup_out {
        let file = File::create(path)
            .with_context(|| format!("failed to create pileup table {}", path.display()))?;
        write_pileup_csv(BufWriter::new(file), &scan.records)?;
    }

    let table = CooccurrenceAnalyzer::new(&sites).analyze(&scan.read_alleles);
    let entries = table.entries();
    info!(sites = sites.len(), pairs = entries.len(), "co-occurrence computed");

    let mut writer = open_output(args.json_out.as_ref())?;
    write_cooccurrence_json(&mut writer, &entries)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
