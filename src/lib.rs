#![forbid(unsafe_code)]
//! # darkreaction
//!
//! Detection of the **dark-reaction** sequencing chemistry from paired-end
//! single-cell ATAC reads, and inference of the **read layout** (barcode and
//! genomic offsets) the aligner needs.
//!
//! ## Highlights
//! - 🧪 **Majority vote** over a bounded prefix of each mate (default 100,000 reads).
//! - 🧭 **Deterministic data**: anchors and layouts are embedded as constants.
//! - 🔒 **Fail closed**: ambiguous or disagreeing samples abort instead of guessing.
//!
//! ## Examples
//! ```rust
//! use darkreaction::layout::LayoutMode;
//! // Fixed layout for a named mode:
//! assert_eq!(LayoutMode::R1R2.layout().as_str(), "bc:0:19,r1:20:-1");
//! // Mode tokens never fail to parse; unknown tokens select the default layout.
//! let m: LayoutMode = "auto-ish".parse().unwrap();
//! assert_eq!(m.layout().as_str(), "bc:6:15,bc:22:31,r1:65:-1,r2:19:-1");
//! ```
//!
//! ## Version
//! See [`VERSION`].

pub mod chemistry;
pub mod detect;
pub mod error;
pub mod layout;
pub mod prepare;
pub mod seqio;
pub mod data { pub mod anchors; pub mod layouts; }

use layout::LayoutMode;

/// Crate version string (from `CARGO_PKG_VERSION`).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenience: one `(mode, mate1_dark, mate2_dark, layout)` row per mode (for CLI/UX).
pub fn list_layout_rows() -> Vec<(String, bool, bool, String)> {
    LayoutMode::ALL
        .iter()
        .map(|m| {
            let (d1, d2) = match m {
                LayoutMode::R1 => (true, false),
                LayoutMode::R2 => (false, true),
                LayoutMode::R1R2 => (true, true),
                LayoutMode::Unset => (false, false),
            };
            (m.as_str().to_string(), d1, d2, m.layout().to_string())
        })
        .collect()
}
