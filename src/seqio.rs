//! Bounded read sampling from **FASTQ / FASTQ.GZ / FASTA / SAM / BAM**.
//!
//! ### Design
//! - **FASTX** (plain or gzipped) parsed with `needletail`
//! - **SAM/BAM** parsed with `rust-htslib`
//! - Only the sequence of each record is kept; reading stops after `n` records.
//!
//! Detection works on an in-memory prefix, so sampling goes through the
//! [`ReadSampler`] trait: [`FastxSampler`] reads files, [`MemorySampler`]
//! serves reads already held in memory.
//!
//! ### Example
//! ```no_run
//! use darkreaction::seqio::{FastxSampler, ReadSampler};
//! let reads = FastxSampler.sample("sample_R1.fq.gz".as_ref(), 100_000).unwrap();
//! println!("sampled {} reads", reads.len());
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use needletail::errors::ParseErrorKind;
use needletail::parse_fastx_file;
use rust_htslib::bam;
use rust_htslib::bam::Read;
use tracing::debug;

use crate::error::{Error, Result};

/// Input format detected from path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat { Fastx, Bam, Sam }

/// Guess the format from the file name. Unknown extensions are treated as FASTX,
/// which `needletail` sniffs from content (gzip included).
pub fn detect_format(p: &Path) -> InputFormat {
    match p.extension().and_then(|s| s.to_str()).map(|s| s.to_ascii_lowercase()).as_deref() {
        Some("bam") => InputFormat::Bam,
        Some("sam") => InputFormat::Sam,
        _ => InputFormat::Fastx,
    }
}

/// Source of the first `n` read sequences of a file.
pub trait ReadSampler {
    /// Return at most `n` sequences, in file order. Fewer are returned when the file is shorter.
    fn sample(&self, path: &Path, n: usize) -> Result<Vec<Vec<u8>>>;
}

fn io_err(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Io { path: path.to_path_buf(), message: e.to_string() }
}

/// Samples reads from files on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastxSampler;

impl ReadSampler for FastxSampler {
    fn sample(&self, path: &Path, n: usize) -> Result<Vec<Vec<u8>>> {
        let fmt = detect_format(path);
        let mut seqs: Vec<Vec<u8>> = Vec::with_capacity(n.min(1 << 20));
        match fmt {
            InputFormat::Fastx => {
                let mut reader = match parse_fastx_file(path) {
                    Ok(r) => r,
                    Err(e) if matches!(e.kind, ParseErrorKind::EmptyFile) => return Ok(seqs),
                    Err(e) => return Err(io_err(path, e)),
                };
                while seqs.len() < n {
                    let Some(record) = reader.next() else { break };
                    let rec = record.map_err(|e| io_err(path, e))?;
                    seqs.push(rec.seq().to_vec());
                }
            }
            InputFormat::Bam | InputFormat::Sam => {
                let mut reader = bam::Reader::from_path(path).map_err(|e| io_err(path, e))?;
                for result in reader.records().take(n) {
                    let rec = result.map_err(|e| io_err(path, e))?;
                    seqs.push(rec.seq().as_bytes());
                }
            }
        }
        debug!(path = %path.display(), format = ?fmt, sampled = seqs.len(), "sampled reads");
        Ok(seqs)
    }
}

/// Serves reads held in memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemorySampler {
    reads: HashMap<PathBuf, Vec<Vec<u8>>>,
}

impl MemorySampler {
    /// Register the reads served for `path`.
    pub fn with<P, I, S>(mut self, path: P, reads: I) -> Self
    where
        P: Into<PathBuf>,
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        self.reads.insert(path.into(), reads.into_iter().map(Into::into).collect());
        self
    }
}

impl ReadSampler for MemorySampler {
    fn sample(&self, path: &Path, n: usize) -> Result<Vec<Vec<u8>>> {
        let reads = self.reads.get(path).ok_or_else(|| io_err(path, "no reads registered for path"))?;
        Ok(reads.iter().take(n).cloned().collect())
    }
}
