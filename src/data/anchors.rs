//! Anchor motifs used to recognise the dark-reaction chemistry.
//!
//! Each anchor is a fixed sequence expected at a fixed offset of an undarkened
//! read. When the first sequencing cycles run dark the motif is never imaged,
//! so its absence at the expected offset marks the read as dark.
//!
//! - Mate1 carries the bead oligo: a 6-base head motif at `[0, 6)`, the first
//!   barcode block, and a 6-base linker at `[16, 22)` ahead of the second block.
//! - Mate2 starts with the 19-base Tn5 mosaic end (ME) at `[0, 19)`.
//!
//! Sequences are uppercase DNA.

/// A motif expected at a fixed 0-based offset of a read.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Anchor {
    /// Short stable name used in logs.
    pub name: &'static str,
    /// Uppercase DNA string.
    pub sequence: &'static str,
    /// 0-based start of the motif within the read.
    pub offset: usize,
}

impl Anchor {
    /// End (exclusive) of the window this anchor occupies.
    pub const fn end(&self) -> usize { self.offset + self.sequence.len() }

    /// The read window this anchor is compared against, or `None` if the read is too short.
    pub fn window<'r>(&self, read: &'r [u8]) -> Option<&'r [u8]> {
        read.get(self.offset..self.end())
    }
}

/// Mate1 bead-oligo head motif, `read[0:6]`.
pub const MATE1_HEAD_ANCHOR: Anchor = Anchor { name: "bead_head", sequence: "TCTGCG", offset: 0 };

/// Mate1 linker between the two barcode blocks, `read[16:22]`.
pub const MATE1_LINKER_ANCHOR: Anchor = Anchor { name: "bead_linker", sequence: "CCTTCC", offset: 16 };

/// Mate2 Tn5 mosaic end, `read[0:19]`.
pub const MATE2_ANCHOR: Anchor = Anchor { name: "tn5_mosaic_end", sequence: "AGATGTGTATAAGAGACAG", offset: 0 };

/// Mate1 reads longer than this that match neither anchor are classified `Other`.
pub const MATE1_MAX_DARK_LEN: usize = 105;

/// Maximum Hamming distance at which the mate2 anchor still counts as present.
pub const MATE2_MAX_MISMATCHES: u64 = 2;

/// Minimum fraction of the sample the majority variant must reach.
pub const MIN_MAJORITY_FRACTION: f64 = 0.5;

/// Number of leading reads sampled per file.
pub const DEFAULT_SAMPLE_SIZE: usize = 100_000;
