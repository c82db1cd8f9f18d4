use std::path::Path;

use ahash::{AHashMap, AHashSet};
use anyhow::{bail, ensure, Context, Result};
use hexcover::{ancestor, parse_cell, CellIndex, Resolution};
use polars::prelude::{Column, DataFrame, NamedFrom, Series};
use serde::Serialize;

use crate::common::{read_csv, string_column, write_csv};

/// Backbone attributes of one coarse cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackboneEntry {
    pub moku_id: String,
    pub moku_name: Option<String>,
    pub island: Option<String>,
}

/// One backbone partition (district), as loaded into the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub moku_id: String,
    pub name: Option<String>,
    pub island: Option<String>,
}

/// Result of claiming a cell for a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    New,
    /// Already claimed with identical attributes.
    Same,
    /// Already claimed by another partition; the first claim is kept.
    Conflict,
}

/// A fine cell's coarse ancestor and the backbone entry behind it, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor<'a> {
    pub parent: Option<CellIndex>,
    pub entry: Option<&'a BackboneEntry>,
}

/// Read-only lookup from coarse cell to partition, built once per run.
#[derive(Debug, Clone)]
pub struct BackboneTable {
    resolution: Resolution,
    cells: AHashMap<CellIndex, BackboneEntry>,
    order: Vec<CellIndex>,
}

impl BackboneTable {
    pub fn new(resolution: Resolution) -> Self {
        Self { resolution, cells: AHashMap::new(), order: Vec::new() }
    }

    #[inline] pub fn resolution(&self) -> Resolution { self.resolution }

    #[inline] pub fn len(&self) -> usize { self.order.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.order.is_empty() }

    #[inline] pub fn get(&self, cell: CellIndex) -> Option<&BackboneEntry> { self.cells.get(&cell) }

    /// Claim `cell` for `entry`. The first claim on a cell wins.
    pub fn insert(&mut self, cell: CellIndex, entry: BackboneEntry) -> Result<Claim> {
        ensure!(
            cell.resolution() == self.resolution,
            "[backbone] cell {cell} has resolution {}, expected {}", cell.resolution(), self.resolution,
        );
        Ok(match self.cells.get(&cell) {
            Some(existing) if *existing == entry => Claim::Same,
            Some(_) => Claim::Conflict,
            None => {
                self.cells.insert(cell, entry);
                self.order.push(cell);
                Claim::New
            }
        })
    }

    /// Ancestor of `cell` at the backbone resolution and its entry.
    ///
    /// A miss is `entry: None`; callers keep it empty rather than guessing.
    pub fn resolve(&self, cell: CellIndex) -> Anchor<'_> {
        let parent = ancestor(cell, self.resolution);
        Anchor { parent, entry: parent.and_then(|p| self.cells.get(&p)) }
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = (CellIndex, &BackboneEntry)> + '_ {
        self.order.iter().filter_map(|cell| Some((*cell, self.cells.get(cell)?)))
    }

    /// Distinct partitions, first-seen order.
    pub fn partitions(&self) -> Vec<Partition> {
        let mut seen = AHashSet::new();
        let mut partitions = Vec::new();
        for (_, entry) in self.rows() {
            if seen.insert(entry.moku_id.as_str()) {
                partitions.push(Partition {
                    moku_id: entry.moku_id.clone(),
                    name: entry.moku_name.clone(),
                    island: entry.island.clone(),
                });
            }
        }
        partitions
    }

    /// Reads `h3_index,resolution,moku_id,moku_name,island`.
    pub fn read_csv(path: &Path, resolution: Resolution) -> Result<Self> {
        let df = read_csv(path)?;
        let cells = string_column(&df, "h3_index")?;
        let mokus = string_column(&df, "moku_id")?;
        let names = string_column(&df, "moku_name")?;
        let islands = string_column(&df, "island")?;

        let mut table = Self::new(resolution);
        let mut conflicts = 0;
        for row in 0..df.height() {
            let (Some(text), Some(moku_id)) = (cells[row], mokus[row]) else {
                bail!("[backbone] {} row {} needs h3_index and moku_id", path.display(), row + 1);
            };
            let cell = parse_cell(text)
                .with_context(|| format!("[backbone] {} row {}: invalid cell {text:?}", path.display(), row + 1))?;
            let entry = BackboneEntry {
                moku_id: moku_id.to_string(),
                moku_name: names[row].map(str::to_string),
                island: islands[row].map(str::to_string),
            };
            if table.insert(cell, entry)? == Claim::Conflict {
                conflicts += 1;
            }
        }
        if conflicts > 0 {
            tracing::warn!(path = %path.display(), conflicts, "backbone cells claimed twice; kept first claim");
        }
        tracing::info!(path = %path.display(), cells = table.len(), "loaded backbone");
        Ok(table)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let rows = self.rows().collect::<Vec<_>>();
        let resolution = u8::from(self.resolution) as u32;
        let columns: Vec<Column> = vec![
            Series::new("h3_index".into(), rows.iter().map(|(c, _)| c.to_string()).collect::<Vec<_>>()).into(),
            Series::new("resolution".into(), vec![resolution; rows.len()]).into(),
            Series::new("moku_id".into(), rows.iter().map(|(_, e)| e.moku_id.clone()).collect::<Vec<_>>()).into(),
            Series::new("moku_name".into(), rows.iter().map(|(_, e)| e.moku_name.clone()).collect::<Vec<_>>()).into(),
            Series::new("island".into(), rows.iter().map(|(_, e)| e.island.clone()).collect::<Vec<_>>()).into(),
        ];
        let mut df = DataFrame::new(columns).context("[backbone] Failed to assemble backbone frame")?;
        write_csv(&mut df, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexcover::{cell_at, Position};

    fn entry(moku: &str) -> BackboneEntry {
        BackboneEntry { moku_id: moku.into(), moku_name: Some(moku.to_uppercase()), island: Some("oahu".into()) }
    }

    fn coarse(lon: f64, lat: f64) -> CellIndex {
        cell_at(Position::new(lon, lat), Resolution::Seven).unwrap()
    }

    #[test]
    fn first_claim_wins() {
        let mut table = BackboneTable::new(Resolution::Seven);
        let cell = coarse(-158.0, 21.4);
        assert_eq!(table.insert(cell, entry("ewa")).unwrap(), Claim::New);
        assert_eq!(table.insert(cell, entry("ewa")).unwrap(), Claim::Same);
        assert_eq!(table.insert(cell, entry("waianae")).unwrap(), Claim::Conflict);
        assert_eq!(table.get(cell).map(|e| e.moku_id.as_str()), Some("ewa"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn rejects_cells_at_other_resolutions() {
        let mut table = BackboneTable::new(Resolution::Seven);
        let fine = cell_at(Position::new(-158.0, 21.4), Resolution::Nine).unwrap();
        assert!(table.insert(fine, entry("ewa")).is_err());
    }

    #[test]
    fn resolve_walks_to_backbone_resolution() {
        let mut table = BackboneTable::new(Resolution::Seven);
        let fine = cell_at(Position::new(-158.0, 21.4), Resolution::Twelve).unwrap();
        let parent = fine.parent(Resolution::Seven).unwrap();
        table.insert(parent, entry("ewa")).unwrap();

        let anchor = table.resolve(fine);
        assert_eq!(anchor.parent, Some(parent));
        assert_eq!(anchor.entry.map(|e| e.moku_id.as_str()), Some("ewa"));
    }

    #[test]
    fn miss_keeps_parent_but_no_entry() {
        let table = BackboneTable::new(Resolution::Seven);
        let fine = cell_at(Position::new(-155.5, 19.6), Resolution::Ten).unwrap();
        let anchor = table.resolve(fine);
        assert!(anchor.parent.is_some());
        assert!(anchor.entry.is_none());
    }

    #[test]
    fn csv_round_trip_and_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ZoneCell.csv");
        let mut table = BackboneTable::new(Resolution::Seven);
        table.insert(coarse(-158.0, 21.4), entry("ewa")).unwrap();
        table.insert(coarse(-157.8, 21.3), entry("kona")).unwrap();
        table.insert(coarse(-158.1, 21.45), entry("ewa")).unwrap();
        table.write_csv(&path).unwrap();

        let back = BackboneTable::read_csv(&path, Resolution::Seven).unwrap();
        assert_eq!(back.rows().collect::<Vec<_>>(), table.rows().collect::<Vec<_>>());
        let ids: Vec<_> = back.partitions().into_iter().map(|p| p.moku_id).collect();
        assert_eq!(ids, vec!["ewa", "kona"]);
    }
}
