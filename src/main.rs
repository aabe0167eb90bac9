use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flate2::read::GzDecoder;
use log::{info, LevelFilter};

use gene_anno::{AnnotationBuilder, Annotator, FrequencyTable, GeneAnnotationParam, GeneIndex, SequenceStore};

/// Annotate variants against gene models, or build and inspect gene index caches.
#[derive(Parser, Debug)]
#[command(name = "gene-anno")]
#[command(author, version, about)]
struct Cli {
    /// Log progress at info level (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Worker threads for classification (default: all cores)
    #[arg(long, global = true, value_parser = clap::value_parser!(u16).range(1..))]
    threads: Option<u16>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Annotate a tab-separated variant file (VCF body or similar)
    Annotate(AnnotateArgs),

    /// Build a gene index from a refFlat/genePred table and write it to disk
    Build(BuildArgs),

    /// Print summary stats of a gene table or serialized index
    Stats(StatsArgs),
}

/// Classification ranges, in bases. Unset flags keep the base value: the
/// defaults (500/500/3/8) for a gene table, the stored ranges for an index.
#[derive(Args, Debug, Default)]
struct ParamArgs {
    /// Bases before the transcript start counted as upstream [default: 500]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    upstream: Option<u32>,

    /// Bases after the transcript end counted as downstream [default: 500]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    downstream: Option<u32>,

    /// Exonic bases next to an exon/intron boundary counted as splice site [default: 3]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    splice_into_exon: Option<u32>,

    /// Intronic bases next to an exon/intron boundary counted as splice site [default: 8]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    splice_into_intron: Option<u32>,
}

impl ParamArgs {
    fn is_empty(&self) -> bool {
        self.upstream.is_none()
            && self.downstream.is_none()
            && self.splice_into_exon.is_none()
            && self.splice_into_intron.is_none()
    }

    fn apply(&self, base: GeneAnnotationParam) -> GeneAnnotationParam {
        GeneAnnotationParam {
            upstream_range: self.upstream.unwrap_or(base.upstream_range),
            downstream_range: self.downstream.unwrap_or(base.downstream_range),
            splice_into_exon: self.splice_into_exon.unwrap_or(base.splice_into_exon),
            splice_into_intron: self.splice_into_intron.unwrap_or(base.splice_into_intron),
        }
    }
}

#[derive(Args, Debug)]
struct AnnotateArgs {
    /// Variant file (.gz accepted)
    #[arg(long, short)]
    input: PathBuf,

    /// Gene table (refFlat / genePred, .gz accepted)
    #[arg(long, short, required_unless_present = "index", conflicts_with = "index")]
    genes: Option<PathBuf>,

    /// Serialized gene index written by `build`
    #[arg(long)]
    index: Option<PathBuf>,

    /// Reference FASTA for codon bases and effect labels (.gz accepted)
    #[arg(long, short)]
    reference: Option<PathBuf>,

    /// Output table (default: stdout)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Write <PREFIX>.anno.freq, .base.freq, .codon.freq and .indel.freq
    #[arg(long, value_name = "PREFIX")]
    freq: Option<PathBuf>,

    #[command(flatten)]
    params: ParamArgs,
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Gene table (refFlat / genePred, .gz accepted)
    #[arg(long, short)]
    genes: PathBuf,

    /// Output serialized index file
    #[arg(long, short)]
    output: PathBuf,

    #[command(flatten)]
    params: ParamArgs,
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Gene table (refFlat / genePred, .gz accepted)
    #[arg(long, short, required_unless_present = "index", conflicts_with = "index")]
    genes: Option<PathBuf>,

    /// Serialized index file
    #[arg(long)]
    index: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => {
            builder.parse_filters(&filters);
        }
        Err(_) => {
            builder.filter_level(if verbose { LevelFilter::Info } else { LevelFilter::Warn });
        }
    }
    builder.init();
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let is_gz = path.extension().map(|e| e == "gz").unwrap_or(false);
    Ok(if is_gz {
        Box::new(BufReader::new(GzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    })
}

fn load_index(genes: Option<&Path>, index: Option<&Path>, overrides: &ParamArgs) -> Result<GeneIndex> {
    match (genes, index) {
        (Some(g), _) => AnnotationBuilder::new(overrides.apply(GeneAnnotationParam::default()))
            .build_from_path(g)
            .with_context(|| format!("building index from {}", g.display())),
        (None, Some(i)) => {
            let mut idx = GeneIndex::load(i).with_context(|| format!("reading index {}", i.display()))?;
            if !overrides.is_empty() {
                let params = overrides.apply(*idx.params());
                info!("Overriding stored ranges of {}", i.display());
                idx.set_params(params);
            }
            Ok(idx)
        }
        (None, None) => anyhow::bail!("either --genes or --index is required"),
    }
}

fn run_annotate(args: AnnotateArgs) -> Result<()> {
    let idx = load_index(args.genes.as_deref(), args.index.as_deref(), &args.params)?;

    let reference = match &args.reference {
        Some(p) => Some(SequenceStore::open(p).with_context(|| format!("loading reference {}", p.display()))?),
        None => None,
    };

    let input = open_input(&args.input)?;
    let output: Box<dyn Write> = match &args.output {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("create {}", p.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let annotator = Annotator::new(&idx, reference.as_ref());
    let mut freq = args.freq.as_ref().map(|_| FrequencyTable::new());

    let summary = annotator
        .annotate_reader_with(input, output, |variant, records| {
            if let Some(t) = freq.as_mut() {
                t.add(variant, records);
            }
        })
        .with_context(|| format!("annotating {}", args.input.display()))?;

    if let (Some(prefix), Some(t)) = (&args.freq, &freq) {
        t.write_all(prefix)
            .with_context(|| format!("writing frequency tables to {}.*", prefix.display()))?;
    }

    eprintln!(
        "Annotated {} variants: {} records, {} malformed lines skipped",
        summary.variants, summary.records, summary.skipped
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(n) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n as usize)
            .build_global()
            .context("configuring worker threads")?;
        info!("Using {n} worker threads");
    }

    match cli.cmd {
        Command::Annotate(args) => run_annotate(args)?,

        Command::Build(args) => {
            let idx = load_index(Some(&args.genes), None, &args.params)?;

            println!("{idx}");

            idx.save(&args.output)
                .with_context(|| format!("writing index to {}", args.output.display()))?;

            eprintln!("Index written to {}", args.output.display());
        }

        Command::Stats(args) => {
            let idx = load_index(args.genes.as_deref(), args.index.as_deref(), &ParamArgs::default())?;
            println!("{idx}");
        }
    }

    Ok(())
}
