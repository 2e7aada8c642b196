//! Read-layout resolution.
//!
//! A [`ReadLayout`] is the `--read-format` descriptor handed to the aligner. It
//! comes from one of three places, in priority order:
//!
//! 1. an explicit descriptor supplied by the caller, returned verbatim;
//! 2. an explicit [`LayoutMode`] token, looked up in a static table;
//! 3. automatic detection over every input pair, looked up by the
//!    (mate1, mate2) verdict pair.
//!
//! Grammar of a descriptor:
//! ```text
//! Layout  := Segment (',' Segment)*
//! Segment := Name ':' Start ':' End
//! Name    := 'bc' | 'r1' | 'r2'
//! Start   := [0-9]+
//! End     := [0-9]+ | '-1'
//! ```
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use tracing::info;

use crate::chemistry::{ChemistryVariant, Mate, PairVerdicts};
use crate::data::layouts::{LAYOUT_DEFAULT, LAYOUT_R1, LAYOUT_R1R2, LAYOUT_R2};
use crate::detect::ChemistryDetector;
use crate::error::{Error, Result};
use crate::seqio::ReadSampler;

// ---------------------------------------------------------------------------
// LayoutMode
// ---------------------------------------------------------------------------

/// Named dark-reaction mode: which mates ran dark.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum LayoutMode {
    R1,
    R2,
    R1R2,
    /// Neither mate dark; also any unrecognised token.
    Unset,
}

impl LayoutMode {
    pub const ALL: [LayoutMode; 4] = [LayoutMode::R1, LayoutMode::R2, LayoutMode::R1R2, LayoutMode::Unset];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::R1 => "R1",
            LayoutMode::R2 => "R2",
            LayoutMode::R1R2 => "R1R2",
            LayoutMode::Unset => "Unset",
        }
    }

    /// Static descriptor for this mode.
    pub fn layout(&self) -> ReadLayout {
        let s = match self {
            LayoutMode::R1 => LAYOUT_R1,
            LayoutMode::R2 => LAYOUT_R2,
            LayoutMode::R1R2 => LAYOUT_R1R2,
            LayoutMode::Unset => LAYOUT_DEFAULT,
        };
        ReadLayout(Cow::Borrowed(s))
    }

    /// The 2×2 verdict table. Anything that is not a dark reaction counts as "not dark".
    pub fn from_verdicts(mate1: ChemistryVariant, mate2: ChemistryVariant) -> LayoutMode {
        use ChemistryVariant::DarkReaction as Dark;
        match (mate1 == Dark, mate2 == Dark) {
            (true, false) => LayoutMode::R1,
            (false, true) => LayoutMode::R2,
            (true, true) => LayoutMode::R1R2,
            (false, false) => LayoutMode::Unset,
        }
    }
}

impl std::str::FromStr for LayoutMode {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "R1" => LayoutMode::R1,
            "R2" => LayoutMode::R2,
            "R1R2" => LayoutMode::R1R2,
            _ => LayoutMode::Unset,
        })
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// ---------------------------------------------------------------------------
// ReadLayout
// ---------------------------------------------------------------------------

/// An immutable read-layout descriptor such as `bc:0:19,r1:20:-1`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ReadLayout(Cow<'static, str>);

/// Which sequence a layout segment refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SegmentKind {
    Barcode,
    Read1,
    Read2,
}

/// One `name:start:end` segment. `end == None` means to the end of the read.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct LayoutSegment {
    pub kind: SegmentKind,
    pub start: usize,
    pub end: Option<usize>,
}

impl LayoutSegment {
    /// Length in bases, `None` when unbounded.
    pub fn len(&self) -> Option<usize> { self.end.map(|e| e + 1 - self.start) }
}

impl ReadLayout {
    /// Wrap a caller-supplied descriptor without touching it.
    pub fn from_raw(s: impl Into<String>) -> Self { ReadLayout(Cow::Owned(s.into())) }

    pub fn as_str(&self) -> &str { &self.0 }

    /// Parse the descriptor into segments.
    pub fn segments(&self) -> Result<Vec<LayoutSegment>> {
        let mut out = Vec::new();
        for part in self.0.split(',') {
            let fields: Vec<&str> = part.trim().split(':').collect();
            let [name, start, end] = fields.as_slice() else {
                return Err(Error::InvalidInput(format!("layout segment '{part}' is not name:start:end")));
            };
            let kind = match *name {
                "bc" => SegmentKind::Barcode,
                "r1" => SegmentKind::Read1,
                "r2" => SegmentKind::Read2,
                other => return Err(Error::InvalidInput(format!("unknown layout segment '{other}' in '{part}'"))),
            };
            let start: usize = start
                .parse()
                .map_err(|_| Error::InvalidInput(format!("bad start offset in layout segment '{part}'")))?;
            let end = match *end {
                "-1" => None,
                e => {
                    let e: usize = e
                        .parse()
                        .map_err(|_| Error::InvalidInput(format!("bad end offset in layout segment '{part}'")))?;
                    if e < start {
                        return Err(Error::InvalidInput(format!("layout segment '{part}' ends before it starts")));
                    }
                    Some(e)
                }
            };
            out.push(LayoutSegment { kind, start, end });
        }
        if !out.iter().any(|s| s.kind == SegmentKind::Barcode) {
            return Err(Error::InvalidInput(format!("layout '{}' has no barcode segment", self.0)));
        }
        Ok(out)
    }

    /// Total barcode length in bases, if every barcode segment is bounded.
    pub fn barcode_len(&self) -> Result<Option<usize>> {
        let segs = self.segments()?;
        Ok(segs
            .iter()
            .filter(|s| s.kind == SegmentKind::Barcode)
            .map(|s| s.len())
            .sum::<Option<usize>>())
    }
}

impl fmt::Display for ReadLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// One `--fastq1` / `--fastq2` pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InputPair {
    pub fastq1: PathBuf,
    pub fastq2: PathBuf,
}

/// How a layout was obtained.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutSource {
    Explicit,
    Mode(LayoutMode),
    /// Detected, with one entry per input pair.
    Detected { mode: LayoutMode, pairs: Vec<PairVerdicts> },
}

impl LayoutSource {
    pub fn label(&self) -> &'static str {
        match self {
            LayoutSource::Explicit => "explicit",
            LayoutSource::Mode(_) => "mode",
            LayoutSource::Detected { .. } => "detected",
        }
    }

    pub fn mode(&self) -> Option<LayoutMode> {
        match self {
            LayoutSource::Explicit => None,
            LayoutSource::Mode(m) | LayoutSource::Detected { mode: m, .. } => Some(*m),
        }
    }
}

/// A resolved layout plus its provenance.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub layout: ReadLayout,
    pub source: LayoutSource,
}

/// Resolves the read layout, running the detector only in automatic mode.
pub struct ReadLayoutResolver<'a, S: ReadSampler> {
    detector: &'a ChemistryDetector,
    sampler: &'a S,
}

impl<'a, S: ReadSampler> ReadLayoutResolver<'a, S> {
    pub fn new(detector: &'a ChemistryDetector, sampler: &'a S) -> Self {
        ReadLayoutResolver { detector, sampler }
    }

    /// Resolve the layout. An explicit descriptor wins over a mode, a mode wins over detection.
    pub fn resolve(
        &self,
        explicit_layout: Option<&str>,
        explicit_mode: Option<LayoutMode>,
        pairs: &[InputPair],
    ) -> Result<Resolution> {
        if let Some(raw) = explicit_layout {
            return Ok(Resolution { layout: ReadLayout::from_raw(raw), source: LayoutSource::Explicit });
        }
        if let Some(mode) = explicit_mode {
            return Ok(Resolution { layout: mode.layout(), source: LayoutSource::Mode(mode) });
        }
        let verdicts = self.detect_pairs(pairs)?;
        let mode = unanimous_mode(&verdicts)?;
        Ok(Resolution { layout: mode.layout(), source: LayoutSource::Detected { mode, pairs: verdicts } })
    }

    /// Detect both mates of every pair, sequentially and without short-circuiting on disagreement.
    pub fn detect_pairs(&self, pairs: &[InputPair]) -> Result<Vec<PairVerdicts>> {
        if pairs.is_empty() {
            return Err(Error::InvalidInput("no input pairs to detect chemistry from".into()));
        }
        let n = self.detector.config().sample_size;
        let mut out = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let r1 = self.sampler.sample(&pair.fastq1, n)?;
            let mate1 = self.detector.detect(Mate::Mate1, &r1)?;
            let r2 = self.sampler.sample(&pair.fastq2, n)?;
            let mate2 = self.detector.detect(Mate::Mate2, &r2)?;
            info!(fastq1 = %pair.fastq1.display(), fastq2 = %pair.fastq2.display(), "{mate1}; {mate2}");
            out.push(PairVerdicts { mate1, mate2 });
        }
        Ok(out)
    }
}

/// Require every pair to agree on each mate's variant, then look the pair up in the table.
pub fn unanimous_mode(verdicts: &[PairVerdicts]) -> Result<LayoutMode> {
    let mate1 = unanimous(Mate::Mate1, verdicts.iter().map(|v| v.mate1.variant).collect())?;
    let mate2 = unanimous(Mate::Mate2, verdicts.iter().map(|v| v.mate2.variant).collect())?;
    Ok(LayoutMode::from_verdicts(mate1, mate2))
}

fn unanimous(mate: Mate, observed: Vec<ChemistryVariant>) -> Result<ChemistryVariant> {
    let distinct: BTreeSet<ChemistryVariant> = observed.iter().copied().collect();
    match distinct.len() {
        1 => Ok(observed[0]),
        0 => Err(Error::InvalidInput(format!("no {mate} verdicts to compare"))),
        _ => Err(Error::ChemistryMismatch { mate, observed }),
    }
}
