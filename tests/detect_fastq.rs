//! End-to-end detection over FASTQ fixtures on disk.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use darkreaction::chemistry::{ChemistryVariant, Mate};
use darkreaction::detect::{ChemistryDetector, DetectorConfig};
use darkreaction::error::Error;
use darkreaction::layout::{InputPair, LayoutMode, LayoutSource, ReadLayoutResolver};
use darkreaction::prepare::{self, PrepareOpts};
use darkreaction::seqio::FastxSampler;

const ME: &str = "AGATGTGTATAAGAGACAG";

fn write_fastq_gz(path: &Path, seqs: &[String]) {
    let mut gz = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    for (i, s) in seqs.iter().enumerate() {
        writeln!(gz, "@read{i}\n{s}\n+\n{}", "I".repeat(s.len())).unwrap();
    }
    gz.finish().unwrap();
}

/// Mate1 reads: the first `no_dark` carry the head anchor, the rest are short and unanchored.
fn mate1(no_dark: usize, total: usize) -> Vec<String> {
    (0..total)
        .map(|i| if i < no_dark { format!("TCTGCG{}", "ACGT".repeat(24)) } else { "GTA".repeat(30) })
        .collect()
}

/// Mate2 reads: the first `no_dark` start with the mosaic end (two mismatches allowed).
fn mate2(no_dark: usize, total: usize) -> Vec<String> {
    (0..total)
        .map(|i| {
            if i < no_dark {
                let me = if i % 2 == 0 { ME.to_string() } else { format!("C{}C", &ME[1..18]) };
                format!("{me}{}", "ACGT".repeat(12))
            } else {
                "TTTAAACCC".repeat(7)
            }
        })
        .collect()
}

fn fixture(dir: &Path, stem: &str, r1: Vec<String>, r2: Vec<String>) -> InputPair {
    let fastq1 = dir.join(format!("{stem}_R1.fastq.gz"));
    let fastq2 = dir.join(format!("{stem}_R2.fastq.gz"));
    write_fastq_gz(&fastq1, &r1);
    write_fastq_gz(&fastq2, &r2);
    InputPair { fastq1, fastq2 }
}

fn detector(n: usize) -> ChemistryDetector {
    ChemistryDetector::new(DetectorConfig { sample_size: n, ..DetectorConfig::default() })
}

#[test]
fn detects_undarkened_library_from_gzipped_fastq() {
    let tmp = tempfile::tempdir().unwrap();
    let pair = fixture(tmp.path(), "s1", mate1(700, 1000), mate2(800, 1000));
    let res = ReadLayoutResolver::new(&detector(1000), &FastxSampler).resolve(None, None, &[pair]).unwrap();

    let LayoutSource::Detected { mode, pairs } = &res.source else { panic!("expected detection") };
    assert_eq!(*mode, LayoutMode::Unset);
    assert_eq!(pairs[0].mate1.variant, ChemistryVariant::NoDarkReaction);
    assert_eq!(pairs[0].mate1.fraction(), 0.70);
    assert_eq!(pairs[0].mate2.variant, ChemistryVariant::NoDarkReaction);
    assert_eq!(pairs[0].mate2.fraction(), 0.80);
    assert_eq!(res.layout.as_str(), "bc:6:15,bc:22:31,r1:65:-1,r2:19:-1");
}

#[test]
fn multiple_agreeing_pairs_resolve_together() {
    let tmp = tempfile::tempdir().unwrap();
    let a = fixture(tmp.path(), "a", mate1(0, 200), mate2(190, 200));
    let b = fixture(tmp.path(), "b", mate1(20, 200), mate2(200, 200));
    let res = ReadLayoutResolver::new(&detector(200), &FastxSampler).resolve(None, None, &[a, b]).unwrap();
    assert_eq!(res.source.mode(), Some(LayoutMode::R1));
    assert_eq!(res.layout.as_str(), "bc:0:19,r1:20:-1,r2:19:-1");
}

#[test]
fn disagreeing_pairs_fail() {
    let tmp = tempfile::tempdir().unwrap();
    let a = fixture(tmp.path(), "a", mate1(200, 200), mate2(0, 200));
    let b = fixture(tmp.path(), "b", mate1(200, 200), mate2(200, 200));
    let err = ReadLayoutResolver::new(&detector(200), &FastxSampler).resolve(None, None, &[a, b]).unwrap_err();
    assert!(matches!(err, Error::ChemistryMismatch { mate: Mate::Mate2, .. }), "{err}");
}

#[test]
fn short_file_is_insufficient() {
    let tmp = tempfile::tempdir().unwrap();
    let pair = fixture(tmp.path(), "short", mate1(50, 50), mate2(50, 50));
    let err = ReadLayoutResolver::new(&detector(100), &FastxSampler).resolve(None, None, &[pair]).unwrap_err();
    assert!(matches!(err, Error::InsufficientData { mate: Mate::Mate1, available: 50, required: 100 }));
}

#[test]
fn explicit_mode_never_reads_files() {
    let missing = InputPair { fastq1: PathBuf::from("/missing/R1.fq.gz"), fastq2: PathBuf::from("/missing/R2.fq.gz") };
    let res = ReadLayoutResolver::new(&detector(100), &FastxSampler)
        .resolve(None, Some(LayoutMode::R2), &[missing])
        .unwrap();
    assert_eq!(res.layout.as_str(), "bc:6:15,bc:22:31,r1:65:-1");
}

#[test]
fn data_step_dry_run_writes_report() {
    let tmp = tempfile::tempdir().unwrap();
    let pair = fixture(tmp.path(), "lib", mate1(0, 300), mate2(0, 300));
    let opts = PrepareOpts {
        name: "lib".into(),
        outdir: tmp.path().join("out"),
        fastq1: pair.fastq1.display().to_string(),
        fastq2: pair.fastq2.display().to_string(),
        customize: None,
        mode: None,
        threads: 2,
        genome_dir: None,
        bcerror: 1,
        aligner: "chromap".into(),
        dry_run: true,
        json: None,
        detector: DetectorConfig { sample_size: 300, ..DetectorConfig::default() },
    };
    let res = prepare::run(&opts, &FastxSampler).unwrap();
    assert_eq!(res.layout.as_str(), "bc:0:19,r1:20:-1");

    let report: serde_json::Value =
        serde_json::from_reader(File::open(tmp.path().join("out/lib/lib.chemistry.json")).unwrap()).unwrap();
    assert_eq!(report["mode"], "R1R2");
    assert_eq!(report["pairs"][0]["mate1"]["variant"], "darkreaction");
    assert_eq!(report["pairs"][0]["mate2"]["fraction"], 1.0);
}
