//! Read-layout descriptors handed to the aligner as `--read-format`.
//!
//! Offsets are 0-based and inclusive; `-1` means "to the end of the read".
//! `bc` ranges are read from mate1, `r1`/`r2` are the genomic segments of
//! mate1/mate2.

/// Mate1 dark, mate2 imaged: single 20-base barcode block, ME trimmed from mate2.
pub const LAYOUT_R1: &str = "bc:0:19,r1:20:-1,r2:19:-1";

/// Mate1 imaged, mate2 dark: split barcode around the linker, mate2 used whole.
pub const LAYOUT_R2: &str = "bc:6:15,bc:22:31,r1:65:-1";

/// Both mates dark.
pub const LAYOUT_R1R2: &str = "bc:0:19,r1:20:-1";

/// Neither mate dark. Also the fallback for unrecognised mode tokens.
pub const LAYOUT_DEFAULT: &str = "bc:6:15,bc:22:31,r1:65:-1,r2:19:-1";
