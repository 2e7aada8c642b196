//! Chemistry detection from a bounded sample of reads.
//!
//! Each read is classified independently by comparing fixed windows against the
//! anchors in [`crate::data::anchors`]:
//!
//! - **mate1**: exact match of `read[0:6]` or `read[16:22]` ⇒ no dark reaction;
//!   otherwise reads longer than 105 bases are `Other`, the rest dark.
//! - **mate2**: `read[0:19]` within Hamming distance 2 of the mosaic end ⇒ no
//!   dark reaction; otherwise dark.
//!
//! Per-variant counts are then reduced to a majority verdict. Ties go to the
//! variant seen first in the sample.
//!
//! # Examples
//! ```
//! use darkreaction::chemistry::ChemistryVariant;
//! use darkreaction::detect::{ChemistryDetector, DetectorConfig};
//! let det = ChemistryDetector::new(DetectorConfig { sample_size: 3, ..DetectorConfig::default() });
//! let reads = ["TCTGCGAAAA", "TCTGCGCCCC", "GGGGGGGGGG"];
//! let v = det.detect_mate1(&reads).unwrap();
//! assert_eq!(v.variant, ChemistryVariant::NoDarkReaction);
//! assert_eq!(v.count, 2);
//! ```
use bio::alignment::distance::hamming;
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::debug;

use crate::chemistry::{ChemistryVariant, ChemistryVerdict, Mate};
use crate::data::anchors::{self, Anchor};
use crate::error::{Error, Result};

/// The anchor motifs the detector compares reads against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChemistryAnchors {
    pub mate1_head: Anchor,
    pub mate1_linker: Anchor,
    pub mate2: Anchor,
}

impl Default for ChemistryAnchors {
    fn default() -> Self {
        ChemistryAnchors {
            mate1_head: anchors::MATE1_HEAD_ANCHOR,
            mate1_linker: anchors::MATE1_LINKER_ANCHOR,
            mate2: anchors::MATE2_ANCHOR,
        }
    }
}

/// Detector parameters. Built once at startup and never mutated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorConfig {
    pub anchors: ChemistryAnchors,
    /// Number of leading reads classified per file (`N`).
    pub sample_size: usize,
    /// Mate1 reads longer than this with no anchor are `Other`.
    pub mate1_max_dark_len: usize,
    /// Mate2 anchor mismatch budget (inclusive).
    pub mate2_max_mismatches: u64,
    /// Minimum supporting fraction for an accepted verdict (inclusive).
    pub min_fraction: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            anchors: ChemistryAnchors::default(),
            sample_size: anchors::DEFAULT_SAMPLE_SIZE,
            mate1_max_dark_len: anchors::MATE1_MAX_DARK_LEN,
            mate2_max_mismatches: anchors::MATE2_MAX_MISMATCHES,
            min_fraction: anchors::MIN_MAJORITY_FRACTION,
        }
    }
}

#[inline]
fn window_eq(read: &[u8], anchor: &Anchor) -> bool {
    anchor.window(read).is_some_and(|w| w.eq_ignore_ascii_case(anchor.sequence.as_bytes()))
}

/// Classify one mate1 read. Anchor matches take precedence over the length rule.
pub fn classify_mate1(read: &[u8], cfg: &DetectorConfig) -> ChemistryVariant {
    if window_eq(read, &cfg.anchors.mate1_head) || window_eq(read, &cfg.anchors.mate1_linker) {
        ChemistryVariant::NoDarkReaction
    } else if read.len() > cfg.mate1_max_dark_len {
        ChemistryVariant::Other
    } else {
        ChemistryVariant::DarkReaction
    }
}

/// Classify one mate2 read. Never returns [`ChemistryVariant::Other`].
pub fn classify_mate2(read: &[u8], cfg: &DetectorConfig) -> ChemistryVariant {
    let anchor = &cfg.anchors.mate2;
    match anchor.window(read) {
        Some(w) if hamming(&w.to_ascii_uppercase(), anchor.sequence.as_bytes()) <= cfg.mate2_max_mismatches => {
            ChemistryVariant::NoDarkReaction
        }
        _ => ChemistryVariant::DarkReaction,
    }
}

/// Count variants, keeping them in the order they were first encountered.
pub fn tally<I: IntoIterator<Item = ChemistryVariant>>(classes: I) -> Vec<(ChemistryVariant, usize)> {
    let mut counts: Vec<(ChemistryVariant, usize)> = Vec::with_capacity(3);
    for c in classes {
        match counts.iter_mut().find(|(v, _)| *v == c) {
            Some((_, n)) => *n += 1,
            None => counts.push((c, 1)),
        }
    }
    counts
}

/// Highest count wins; on a tie the earlier entry of `counts` is kept.
pub fn majority(counts: &[(ChemistryVariant, usize)]) -> Option<(ChemistryVariant, usize)> {
    let mut best: Option<(ChemistryVariant, usize)> = None;
    for &(v, n) in counts {
        if best.map_or(true, |(_, bn)| n > bn) {
            best = Some((v, n));
        }
    }
    best
}

/// Majority-vote chemistry detector.
pub struct ChemistryDetector {
    config: DetectorConfig,
    pool: Option<ThreadPool>,
}

impl ChemistryDetector {
    /// Detector that classifies on the calling thread.
    pub fn new(config: DetectorConfig) -> Self {
        ChemistryDetector { config, pool: None }
    }

    /// Detector that classifies sampled reads on a local rayon pool of `threads` workers.
    /// Read order, and therefore tie-breaking, is unaffected.
    pub fn with_threads(config: DetectorConfig, threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .build()
            .map_err(|e| Error::InvalidInput(format!("cannot build thread pool: {e}")))?;
        Ok(ChemistryDetector { config, pool: Some(pool) })
    }

    pub fn config(&self) -> &DetectorConfig { &self.config }

    /// Majority verdict for mate1 reads.
    pub fn detect_mate1<R: AsRef<[u8]> + Sync>(&self, reads: &[R]) -> Result<ChemistryVerdict> {
        self.detect(Mate::Mate1, reads)
    }

    /// Majority verdict for mate2 reads.
    pub fn detect_mate2<R: AsRef<[u8]> + Sync>(&self, reads: &[R]) -> Result<ChemistryVerdict> {
        self.detect(Mate::Mate2, reads)
    }

    /// Classify the first `sample_size` reads of `mate` and reduce them to a verdict.
    pub fn detect<R: AsRef<[u8]> + Sync>(&self, mate: Mate, reads: &[R]) -> Result<ChemistryVerdict> {
        let n = self.config.sample_size;
        if n == 0 {
            return Err(Error::InvalidInput("sample size must be at least 1".into()));
        }
        if reads.len() < n {
            return Err(Error::InsufficientData { mate, available: reads.len(), required: n });
        }
        let classes = self.classify_all(mate, &reads[..n]);
        let counts = tally(classes);
        debug!(%mate, ?counts, "chemistry tally");

        let Some((variant, count)) = majority(&counts) else {
            return Err(Error::InsufficientData { mate, available: 0, required: n });
        };
        let verdict = ChemistryVerdict { mate, variant, count, sample_size: n };
        if variant == ChemistryVariant::Other || verdict.fraction() < self.config.min_fraction {
            return Err(Error::AmbiguousChemistry { mate, variant, fraction: verdict.fraction() });
        }
        Ok(verdict)
    }

    fn classify_all<R: AsRef<[u8]> + Sync>(&self, mate: Mate, sample: &[R]) -> Vec<ChemistryVariant> {
        let cfg = &self.config;
        let classify = move |r: &R| match mate {
            Mate::Mate1 => classify_mate1(r.as_ref(), cfg),
            Mate::Mate2 => classify_mate2(r.as_ref(), cfg),
        };
        match &self.pool {
            Some(pool) => pool.install(|| sample.par_iter().map(classify).collect()),
            None => sample.iter().map(classify).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ME: &str = "AGATGTGTATAAGAGACAG";

    fn cfg(n: usize) -> DetectorConfig {
        DetectorConfig { sample_size: n, ..DetectorConfig::default() }
    }

    fn no_dark_head() -> String { format!("TCTGCG{}", "A".repeat(94)) }
    fn no_dark_linker() -> String { format!("{}CCTTCC{}", "G".repeat(16), "A".repeat(78)) }
    fn dark() -> String { "GATTACA".repeat(10) }
    fn other() -> String { "T".repeat(120) }

    fn mutate(seq: &str, positions: &[usize]) -> String {
        let mut b = seq.as_bytes().to_vec();
        for &p in positions {
            b[p] = if b[p] == b'C' { b'G' } else { b'C' };
        }
        String::from_utf8(b).unwrap()
    }

    #[test]
    fn anchor_takes_precedence_over_length() {
        let c = cfg(1);
        let long_head = format!("TCTGCG{}", "A".repeat(200));
        let long_linker = format!("{}CCTTCC{}", "G".repeat(16), "A".repeat(200));
        assert_eq!(classify_mate1(long_head.as_bytes(), &c), ChemistryVariant::NoDarkReaction);
        assert_eq!(classify_mate1(long_linker.as_bytes(), &c), ChemistryVariant::NoDarkReaction);
        assert_eq!(classify_mate1(b"tctgcgaaaa", &c), ChemistryVariant::NoDarkReaction);
    }

    #[test]
    fn long_unanchored_mate1_is_other_and_short_is_dark() {
        let c = cfg(1);
        assert_eq!(classify_mate1("A".repeat(106).as_bytes(), &c), ChemistryVariant::Other);
        assert_eq!(classify_mate1("A".repeat(105).as_bytes(), &c), ChemistryVariant::DarkReaction);
        assert_eq!(classify_mate1(b"TCTG", &c), ChemistryVariant::DarkReaction);
    }

    #[test]
    fn mate2_hamming_boundary() {
        let c = cfg(1);
        let exact = format!("{ME}TTTTTTTT");
        let two = mutate(&exact, &[0, 10]);
        let three = mutate(&exact, &[0, 10, 18]);
        let outside = mutate(&exact, &[0, 10, 19, 20]);
        assert_eq!(classify_mate2(exact.as_bytes(), &c), ChemistryVariant::NoDarkReaction);
        assert_eq!(classify_mate2(two.as_bytes(), &c), ChemistryVariant::NoDarkReaction);
        assert_eq!(classify_mate2(three.as_bytes(), &c), ChemistryVariant::DarkReaction);
        assert_eq!(classify_mate2(outside.as_bytes(), &c), ChemistryVariant::NoDarkReaction);
        assert_eq!(classify_mate2(&ME.as_bytes()[..18], &c), ChemistryVariant::DarkReaction);
    }

    #[test]
    fn majority_and_fraction_are_exact() {
        let mut reads = Vec::new();
        reads.extend(std::iter::repeat(dark()).take(30));
        reads.extend(std::iter::repeat(no_dark_head()).take(45));
        reads.extend(std::iter::repeat(no_dark_linker()).take(15));
        reads.extend(std::iter::repeat(other()).take(10));
        let v = ChemistryDetector::new(cfg(100)).detect_mate1(&reads).unwrap();
        assert_eq!(v.variant, ChemistryVariant::NoDarkReaction);
        assert_eq!(v.count, 60);
        assert_eq!(v.fraction(), 0.60);
    }

    #[test]
    fn other_majority_is_ambiguous() {
        let mut reads: Vec<String> = std::iter::repeat(other()).take(60).collect();
        reads.extend(std::iter::repeat(no_dark_head()).take(40));
        let err = ChemistryDetector::new(cfg(100)).detect_mate1(&reads).unwrap_err();
        assert!(matches!(err, Error::AmbiguousChemistry { variant: ChemistryVariant::Other, .. }));
    }

    #[test]
    fn no_class_reaching_half_is_ambiguous() {
        let mut reads: Vec<String> = std::iter::repeat(no_dark_head()).take(40).collect();
        reads.extend(std::iter::repeat(dark()).take(35));
        reads.extend(std::iter::repeat(other()).take(25));
        match ChemistryDetector::new(cfg(100)).detect_mate1(&reads) {
            Err(Error::AmbiguousChemistry { mate, variant, fraction }) => {
                assert_eq!(mate, Mate::Mate1);
                assert_eq!(variant, ChemistryVariant::NoDarkReaction);
                assert!((fraction - 0.40).abs() < 1e-12);
            }
            other => panic!("expected ambiguous chemistry, got {other:?}"),
        }
    }

    #[test]
    fn too_few_reads_is_insufficient() {
        let reads: Vec<String> = std::iter::repeat(dark()).take(9).collect();
        let err = ChemistryDetector::new(cfg(10)).detect_mate2(&reads).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { available: 9, required: 10, .. }));
    }

    #[test]
    fn only_the_first_n_reads_are_used() {
        let mut reads: Vec<String> = std::iter::repeat(dark()).take(10).collect();
        reads.extend(std::iter::repeat(no_dark_head()).take(50));
        let v = ChemistryDetector::new(cfg(10)).detect_mate1(&reads).unwrap();
        assert_eq!((v.variant, v.count, v.sample_size), (ChemistryVariant::DarkReaction, 10, 10));
    }

    #[test]
    fn exact_half_tie_goes_to_first_encountered() {
        let mut reads: Vec<String> = std::iter::repeat(dark()).take(5).collect();
        reads.extend(std::iter::repeat(no_dark_head()).take(5));
        let v = ChemistryDetector::new(cfg(10)).detect_mate1(&reads).unwrap();
        assert_eq!(v.variant, ChemistryVariant::DarkReaction);
        assert_eq!(v.fraction(), 0.5);

        reads.reverse();
        let v = ChemistryDetector::new(cfg(10)).detect_mate1(&reads).unwrap();
        assert_eq!(v.variant, ChemistryVariant::NoDarkReaction);
    }

    #[test]
    fn pooled_detection_matches_serial() {
        let mut reads: Vec<String> = Vec::new();
        for i in 0..1000 {
            reads.push(if i % 3 == 0 { dark() } else { format!("{ME}ACGT") });
        }
        let serial = ChemistryDetector::new(cfg(1000)).detect_mate2(&reads).unwrap();
        let pooled = ChemistryDetector::with_threads(cfg(1000), 4).unwrap().detect_mate2(&reads).unwrap();
        assert_eq!(serial, pooled);
        assert_eq!(serial.count, 666);
    }

    #[test]
    fn tally_keeps_first_seen_order() {
        use ChemistryVariant::*;
        let t = tally([Other, DarkReaction, Other, NoDarkReaction]);
        assert_eq!(t, vec![(Other, 2), (DarkReaction, 1), (NoDarkReaction, 1)]);
        assert_eq!(majority(&[(DarkReaction, 3), (NoDarkReaction, 3)]), Some((DarkReaction, 3)));
        assert_eq!(majority(&[]), None);
    }
}
