//! Error types for chemistry detection and layout resolution.
//!
//! Every failure here is fatal for the run: the data is static, so retrying a
//! classification would produce the identical result. The binary surfaces the
//! message and exits non-zero.

use std::fmt;
use std::path::PathBuf;

use crate::chemistry::{ChemistryVariant, Mate};

/// Errors produced by the detector, the resolver and the read sampler.
#[derive(Debug)]
pub enum Error {
    /// Fewer reads than the configured sample size were available.
    InsufficientData {
        /// Mate being sampled.
        mate: Mate,
        /// Reads actually available.
        available: usize,
        /// Reads required.
        required: usize,
    },
    /// The majority variant is `Other`, or it is supported by fewer than half the reads.
    AmbiguousChemistry {
        /// Mate being classified.
        mate: Mate,
        /// Majority variant.
        variant: ChemistryVariant,
        /// Fraction of the sample supporting it.
        fraction: f64,
    },
    /// Input pairs disagree on the chemistry of one mate.
    ChemistryMismatch {
        /// Mate whose verdicts differ.
        mate: Mate,
        /// Per-pair verdict variants, in input order.
        observed: Vec<ChemistryVariant>,
    },
    /// A read file could not be opened or parsed.
    Io {
        /// Path that caused the error.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },
    /// Invalid caller-supplied parameters.
    InvalidInput(String),
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientData { mate, available, required } => write!(
                f,
                "insufficient data: {mate} provides {available} reads but {required} are required for chemistry detection"
            ),
            Self::AmbiguousChemistry { mate, variant, fraction } => write!(
                f,
                "ambiguous chemistry: {mate} majority is {variant} at {:.2}%; set the layout explicitly with --darkreaction or --customize",
                fraction * 100.0
            ),
            Self::ChemistryMismatch { mate, observed } => {
                let labels: Vec<&str> = observed.iter().map(|v| v.as_str()).collect();
                write!(f, "chemistry mismatch: {mate} verdicts differ across input pairs ({})", labels.join(", "))
            }
            Self::Io { path, message } => write!(f, "{}: {message}", path.display()),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
