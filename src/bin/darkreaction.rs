use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use polars::prelude::*;
use tracing_subscriber::EnvFilter;

use darkreaction::detect::{ChemistryDetector, DetectorConfig};
use darkreaction::layout::{unanimous_mode, LayoutMode, ReadLayoutResolver};
use darkreaction::prepare::{self, PrepareOpts};
use darkreaction::seqio::FastxSampler;

/// darkreaction CLI
#[derive(Parser)]
#[command(name = "darkreaction")]
#[command(version)]
#[command(about = "Dark-reaction chemistry detection and read-layout inference for scATAC reads", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the named modes and their read layouts
    Layouts,

    /// Detect the chemistry of each input pair and print the verdicts
    Detect {
        /// Mate1 FASTQ files, comma-separated
        #[arg(long)]
        fastq1: String,
        /// Mate2 FASTQ files, comma-separated, parallel to --fastq1
        #[arg(long)]
        fastq2: String,
        /// Leading reads classified per file
        #[arg(long, default_value_t = darkreaction::data::anchors::DEFAULT_SAMPLE_SIZE)]
        sample_size: usize,
        /// Threads (None = all)
        #[arg(long)]
        threads: Option<usize>,
        /// Emit CSV to stdout
        #[arg(long)]
        csv: bool,
    },

    /// Resolve the read layout, write the chemistry report and run the aligner
    Data {
        /// Sample name
        #[arg(long)]
        name: String,
        /// Output directory; results go to OUTDIR/NAME
        #[arg(long, default_value = ".")]
        outdir: PathBuf,
        /// Mate1 FASTQ files, comma-separated
        #[arg(long)]
        fastq1: String,
        /// Mate2 FASTQ files, comma-separated, parallel to --fastq1
        #[arg(long)]
        fastq2: String,
        /// Explicit read format (e.g. "bc:0:19,r1:20:-1"); skips detection
        #[arg(long)]
        customize: Option<String>,
        /// Dark-reaction mode: auto, R1, R2, R1R2 or unset
        #[arg(long, default_value = "auto")]
        darkreaction: String,
        /// Threads for classification and the aligner
        #[arg(long, default_value_t = 4)]
        threads: usize,
        /// Reference directory holding genome.index and genome.fa
        #[arg(long)]
        genome_dir: Option<PathBuf>,
        /// Barcode error threshold passed to the aligner
        #[arg(long, default_value_t = 1)]
        bcerror: u32,
        /// Leading reads classified per file
        #[arg(long, default_value_t = darkreaction::data::anchors::DEFAULT_SAMPLE_SIZE)]
        sample_size: usize,
        /// Aligner executable
        #[arg(long, default_value = "chromap")]
        aligner: String,
        /// Log the aligner command without running it
        #[arg(long)]
        dry_run: bool,
        /// Chemistry report path (default OUTDIR/NAME/NAME.chemistry.json)
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Layouts => cmd_layouts()?,

        Commands::Detect { fastq1, fastq2, sample_size, threads, csv } => {
            cmd_detect(&fastq1, &fastq2, sample_size, threads, csv)?;
        }

        Commands::Data {
            name, outdir, fastq1, fastq2, customize, darkreaction, threads,
            genome_dir, bcerror, sample_size, aligner, dry_run, json,
        } => {
            let mode = match darkreaction.to_ascii_lowercase().as_str() {
                "auto" => None,
                token => Some(token.parse::<LayoutMode>()?),
            };
            let opts = PrepareOpts {
                name,
                outdir,
                fastq1,
                fastq2,
                customize,
                mode,
                threads,
                genome_dir,
                bcerror,
                aligner,
                dry_run,
                json,
                detector: DetectorConfig { sample_size, ..DetectorConfig::default() },
            };
            let resolution = prepare::run(&opts, &FastxSampler)?;
            println!("{}", resolution.layout);
        }
    }

    Ok(())
}

fn set_polars_fmt() {
    std::env::set_var("POLARS_FMT_TABLE_FORMATTING", "UTF8_FULL");
    std::env::set_var("POLARS_FMT_MAX_COLS", "100000");
    std::env::set_var("POLARS_FMT_MAX_ROWS", "1000000");
    std::env::set_var("POLARS_FMT_STR_LEN", "100000");
    std::env::set_var("POLARS_TABLE_WIDTH", "65535");
}

fn cmd_layouts() -> PolarsResult<()> {
    let rows = darkreaction::list_layout_rows();
    let df = df!(
        "mode"       => rows.iter().map(|r| r.0.clone()).collect::<Vec<_>>(),
        "mate1_dark" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
        "mate2_dark" => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
        "layout"     => rows.iter().map(|r| r.3.clone()).collect::<Vec<_>>(),
    )?;
    set_polars_fmt();
    println!("{}", df);
    Ok(())
}

fn cmd_detect(fastq1: &str, fastq2: &str, sample_size: usize, threads: Option<usize>, csv: bool) -> anyhow::Result<()> {
    let pairs = prepare::parse_input_pairs(fastq1, fastq2)?;
    let config = DetectorConfig { sample_size, ..DetectorConfig::default() };
    let detector = ChemistryDetector::with_threads(config, threads.unwrap_or_else(num_cpus::get))?;
    let verdicts = ReadLayoutResolver::new(&detector, &FastxSampler)
        .detect_pairs(&pairs)
        .context("chemistry detection failed")?;

    let mut df = df!(
        "fastq1"         => pairs.iter().map(|p| p.fastq1.display().to_string()).collect::<Vec<_>>(),
        "fastq2"         => pairs.iter().map(|p| p.fastq2.display().to_string()).collect::<Vec<_>>(),
        "mate1"          => verdicts.iter().map(|v| v.mate1.variant.as_str()).collect::<Vec<_>>(),
        "mate1_fraction" => verdicts.iter().map(|v| v.mate1.fraction()).collect::<Vec<_>>(),
        "mate2"          => verdicts.iter().map(|v| v.mate2.variant.as_str()).collect::<Vec<_>>(),
        "mate2_fraction" => verdicts.iter().map(|v| v.mate2.fraction()).collect::<Vec<_>>(),
        "sample_size"    => verdicts.iter().map(|v| v.mate1.sample_size as u64).collect::<Vec<_>>(),
    )?;
    if csv {
        CsvWriter::new(std::io::stdout()).include_header(true).finish(&mut df)?;
    } else {
        set_polars_fmt();
        println!("{}", df);
    }

    let mode = unanimous_mode(&verdicts)?;
    println!("mode: {mode}\nread format: {}", mode.layout());
    Ok(())
}
