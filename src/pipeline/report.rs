use std::{collections::BTreeMap, fmt, path::PathBuf};

use hexcover::Skip;
use serde::{Deserialize, Serialize};

/// Why a feature produced no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingId,
    NullGeometry,
    MalformedGeometry,
    UnsupportedGeometry,
    NoVertices,
    InvalidCoordinate,
    Unconvertible,
}

impl From<Skip> for SkipReason {
    fn from(skip: Skip) -> Self {
        match skip {
            Skip::Unsupported { .. } => SkipReason::UnsupportedGeometry,
            Skip::NoVertices => SkipReason::NoVertices,
            Skip::InvalidCoordinate => SkipReason::InvalidCoordinate,
            Skip::Unconvertible => SkipReason::Unconvertible,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::MissingId => "missing id",
            SkipReason::NullGeometry => "null geometry",
            SkipReason::MalformedGeometry => "malformed geometry",
            SkipReason::UnsupportedGeometry => "unsupported geometry",
            SkipReason::NoVertices => "no vertices",
            SkipReason::InvalidCoordinate => "invalid coordinate",
            SkipReason::Unconvertible => "unconvertible",
        })
    }
}

/// Counts for one source in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub prefix: String,
    /// Features in the input file.
    pub features: usize,
    /// Features removed by the source's filters.
    pub filtered: usize,
    /// Features dropped by the source-level dedup key.
    pub duplicates: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
    /// Valid features that covered no cell, even after refinement.
    pub uncovered: usize,
    /// Features that needed the finer resolution.
    pub refined: usize,
    /// Sub-polygons or vertices discarded during conversion.
    pub dropped_parts: usize,
    pub zones: usize,
    pub rows: usize,
    pub unique_cells: usize,
    /// Rows whose ancestor has no backbone entry.
    pub unlinked: usize,
    pub by_region: BTreeMap<String, usize>,
}

impl SourceReport {
    pub fn new(prefix: &str) -> Self {
        Self { prefix: prefix.to_string(), ..Self::default() }
    }

    pub(crate) fn skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_default() += 1;
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

impl fmt::Display for SourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} features, {} zones, {} rows, {} unique cells, {} unlinked",
            self.prefix, self.features, self.zones, self.rows, self.unique_cells, self.unlinked,
        )?;
        if self.filtered + self.duplicates > 0 {
            writeln!(f, "  filtered {}, duplicates {}", self.filtered, self.duplicates)?;
        }
        for (reason, n) in &self.skipped {
            writeln!(f, "  skipped ({reason}): {n}")?;
        }
        if self.uncovered + self.refined + self.dropped_parts > 0 {
            writeln!(f, "  uncovered {}, refined {}, dropped parts {}", self.uncovered, self.refined, self.dropped_parts)?;
        }
        for (region, n) in &self.by_region {
            writeln!(f, "  {region:<12} {n:>8}")?;
        }
        Ok(())
    }
}

/// Outcome of a `generate` run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    pub outputs: Vec<PathBuf>,
    pub manifest: PathBuf,
}

impl RunReport {
    pub fn rows(&self) -> usize { self.sources.iter().map(|s| s.rows).sum() }

    pub fn skipped(&self) -> usize { self.sources.iter().map(SourceReport::skipped_total).sum() }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for source in &self.sources {
            write!(f, "{source}")?;
        }
        writeln!(f, "total: {} rows, {} skipped features", self.rows(), self.skipped())?;
        writeln!(f, "manifest: {}", self.manifest.display())
    }
}
