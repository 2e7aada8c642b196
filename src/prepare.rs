//! The data-preparation step: resolve the read layout for a sample, write a
//! chemistry report and hand the layout to the aligner.
//!
//! Output tree for sample `NAME` under `OUTDIR`:
//! ```text
//! OUTDIR/NAME/NAME.chemistry.json
//! OUTDIR/NAME/NAME.fragments.tsv   (written by the aligner)
//! ```
use std::path::PathBuf;
use std::process::Command;

use anyhow::{bail, Context};
use tracing::{info, warn};

use crate::chemistry::ChemistryVerdict;
use crate::detect::{ChemistryDetector, DetectorConfig};
use crate::error::{Error, Result};
use crate::layout::{InputPair, LayoutMode, LayoutSource, ReadLayoutResolver, Resolution};
use crate::seqio::ReadSampler;

/// Options of the `data` command.
#[derive(Debug, Clone)]
pub struct PrepareOpts {
    pub name: String,
    pub outdir: PathBuf,
    /// Comma-separated mate1 paths.
    pub fastq1: String,
    /// Comma-separated mate2 paths, parallel to `fastq1`.
    pub fastq2: String,
    /// Explicit `--read-format` descriptor.
    pub customize: Option<String>,
    /// `None` for automatic detection.
    pub mode: Option<LayoutMode>,
    pub threads: usize,
    pub genome_dir: Option<PathBuf>,
    pub bcerror: u32,
    pub aligner: String,
    pub dry_run: bool,
    pub json: Option<PathBuf>,
    pub detector: DetectorConfig,
}

/// Split parallel comma-separated lists into input pairs.
pub fn parse_input_pairs(fastq1: &str, fastq2: &str) -> Result<Vec<InputPair>> {
    let split = |s: &str| -> Vec<PathBuf> {
        s.split(',').map(str::trim).filter(|p| !p.is_empty()).map(PathBuf::from).collect()
    };
    let (r1, r2) = (split(fastq1), split(fastq2));
    if r1.is_empty() {
        return Err(Error::InvalidInput("--fastq1 lists no files".into()));
    }
    if r1.len() != r2.len() {
        return Err(Error::InvalidInput(format!(
            "--fastq1 lists {} files but --fastq2 lists {}",
            r1.len(),
            r2.len()
        )));
    }
    Ok(r1.into_iter().zip(r2).map(|(fastq1, fastq2)| InputPair { fastq1, fastq2 }).collect())
}

/// Command line of the external aligner run.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignerInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl AlignerInvocation {
    pub fn build(opts: &PrepareOpts, pairs: &[InputPair], resolution: &Resolution) -> Self {
        let r1 = pairs.iter().map(|p| p.fastq1.display().to_string()).collect::<Vec<_>>().join(",");
        let r2 = pairs.iter().map(|p| p.fastq2.display().to_string()).collect::<Vec<_>>().join(",");
        let mut args: Vec<String> = vec!["--preset".into(), "atac".into()];
        if let Some(g) = &opts.genome_dir {
            args.extend(["-x".into(), g.join("genome.index").display().to_string()]);
            args.extend(["-r".into(), g.join("genome.fa").display().to_string()]);
        }
        args.extend(["-1".into(), r1.clone(), "-2".into(), r2, "-b".into(), r1]);
        args.extend(["--read-format".into(), resolution.layout.to_string()]);
        args.extend(["--bc-error-threshold".into(), opts.bcerror.to_string()]);
        args.extend(["-t".into(), opts.threads.max(1).to_string()]);
        args.extend(["-o".into(), sample_dir(opts).join(format!("{}.fragments.tsv", opts.name)).display().to_string()]);
        AlignerInvocation { program: opts.aligner.clone(), args }
    }

    /// Shell-like rendering for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str)).collect::<Vec<_>>().join(" ")
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .with_context(|| format!("failed to launch aligner '{}'", self.program))?;
        if !status.success() {
            bail!("aligner '{}' exited with {status}", self.program);
        }
        Ok(())
    }
}

fn sample_dir(opts: &PrepareOpts) -> PathBuf { opts.outdir.join(&opts.name) }

fn verdict_json(v: &ChemistryVerdict) -> serde_json::Value {
    serde_json::json!({
        "variant": v.variant.as_str(),
        "count": v.count,
        "sample_size": v.sample_size,
        "fraction": v.fraction(),
    })
}

/// JSON report of how the layout was obtained.
pub fn report_json(name: &str, pairs: &[InputPair], resolution: &Resolution) -> serde_json::Value {
    let detected = match &resolution.source {
        LayoutSource::Detected { pairs: verdicts, .. } => Some(verdicts),
        _ => None,
    };
    let pair_rows: Vec<serde_json::Value> = pairs
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut row = serde_json::json!({
                "fastq1": p.fastq1.display().to_string(),
                "fastq2": p.fastq2.display().to_string(),
            });
            if let Some(v) = detected.and_then(|d| d.get(i)) {
                row["mate1"] = verdict_json(&v.mate1);
                row["mate2"] = verdict_json(&v.mate2);
            }
            row
        })
        .collect();
    serde_json::json!({
        "sample": name,
        "source": resolution.source.label(),
        "mode": resolution.source.mode().map(|m| m.as_str()),
        "read_format": resolution.layout.as_str(),
        "pairs": pair_rows,
    })
}

/// Resolve the layout for `opts`; no files are written.
pub fn resolve_layout<S: ReadSampler>(opts: &PrepareOpts, sampler: &S) -> Result<(Vec<InputPair>, Resolution)> {
    let pairs = parse_input_pairs(&opts.fastq1, &opts.fastq2)?;
    let detector = ChemistryDetector::with_threads(opts.detector, opts.threads)?;
    let resolution = ReadLayoutResolver::new(&detector, sampler).resolve(opts.customize.as_deref(), opts.mode, &pairs)?;
    if let Err(e) = resolution.layout.segments() {
        warn!(layout = %resolution.layout, "read format does not parse as a barcode layout: {e}");
    }
    info!(source = resolution.source.label(), mode = ?resolution.source.mode(), read_format = %resolution.layout, "resolved read layout");
    Ok((pairs, resolution))
}

/// Full `data` step: resolve, report, align.
pub fn run<S: ReadSampler>(opts: &PrepareOpts, sampler: &S) -> anyhow::Result<Resolution> {
    let (pairs, resolution) = resolve_layout(opts, sampler)?;

    let dir = sample_dir(opts);
    std::fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;
    let json_path = opts.json.clone().unwrap_or_else(|| dir.join(format!("{}.chemistry.json", opts.name)));
    let f = std::fs::File::create(&json_path).with_context(|| format!("cannot create {}", json_path.display()))?;
    serde_json::to_writer_pretty(f, &report_json(&opts.name, &pairs, &resolution))?;
    info!(path = %json_path.display(), "wrote chemistry report");

    let invocation = AlignerInvocation::build(opts, &pairs, &resolution);
    if opts.dry_run {
        info!("dry run, aligner not started: {}", invocation.command_line());
    } else {
        info!("running aligner: {}", invocation.command_line());
        invocation.run()?;
    }
    Ok(resolution)
}
