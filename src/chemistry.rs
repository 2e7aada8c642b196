//! Core types for **chemistry variants**, **mates** and **verdicts**.
//!
//! This module holds the data model used across the crate. A read is classified
//! into a [`ChemistryVariant`]; a bounded sample of reads from one mate is
//! aggregated into a [`ChemistryVerdict`].
//!
//! # Examples
//! ```
//! use darkreaction::chemistry::{ChemistryVariant, Mate};
//! assert_eq!(ChemistryVariant::DarkReaction.to_string(), "darkreaction");
//! assert_eq!(Mate::Mate2.to_string(), "mate2");
//! ```
use core::fmt;

/// Which end of a read pair a sample was drawn from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Mate {
    /// First read of the pair (`R1`, `--fastq1`). Carries the bead barcode.
    Mate1,
    /// Second read of the pair (`R2`, `--fastq2`).
    Mate2,
}

impl fmt::Display for Mate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mate::Mate1 => f.write_str("mate1"),
            Mate::Mate2 => f.write_str("mate2"),
        }
    }
}

/// Chemistry state of a single read, decided from a structural motif at a fixed offset.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum ChemistryVariant {
    /// The anchor motif is present: the first cycles were imaged.
    NoDarkReaction,
    /// The anchor motif is absent: the first cycles ran dark.
    DarkReaction,
    /// Neither pattern applies (mate1 only). Never accepted as a verdict.
    Other,
}

impl ChemistryVariant {
    /// Stable lower-case label used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChemistryVariant::NoDarkReaction => "nodarkreaction",
            ChemistryVariant::DarkReaction => "darkreaction",
            ChemistryVariant::Other => "other",
        }
    }
}

impl fmt::Display for ChemistryVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Majority verdict for one mate of one input pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChemistryVerdict {
    /// Mate the sample was drawn from.
    pub mate: Mate,
    /// Majority variant.
    pub variant: ChemistryVariant,
    /// Number of sampled reads classified as `variant`.
    pub count: usize,
    /// Number of reads sampled (the `N` of the detector).
    pub sample_size: usize,
}

impl ChemistryVerdict {
    /// Fraction of sampled reads supporting the verdict, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.sample_size == 0 { return 0.0; }
        self.count as f64 / self.sample_size as f64
    }
}

impl fmt::Display for ChemistryVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({}/{}, {:.2}%)", self.mate, self.variant, self.count, self.sample_size, self.fraction() * 100.0)
    }
}

/// Verdicts for both mates of one input pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairVerdicts {
    pub mate1: ChemistryVerdict,
    pub mate2: ChemistryVerdict,
}
