use std::path::Path;

use anyhow::{ensure, Context, Result};
use hexcover::{parse_cell, CellIndex};
use polars::prelude::{Column, DataFrame, NamedFrom, Series};

use crate::common::{read_csv, string_column, write_csv};
use crate::zone::ZoneId;

pub const ASSIGNMENT_COLUMNS: [&str; 9] = [
    "zone_id", "h3_cell", "resolution", "parent_h3", "moku_id", "island", "version", "data_source", "provenance",
];

/// One (zone, cell) output row.
///
/// `parent_h3` and `moku_id` stay `None` when the ancestor is missing or has
/// no backbone entry; they are written as empty fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneCellAssignment {
    pub zone_id: ZoneId,
    pub h3_cell: CellIndex,
    pub parent_h3: Option<CellIndex>,
    pub moku_id: Option<String>,
    pub island: Option<String>,
    pub version: String,
    pub data_source: String,
    pub provenance: String,
}

impl ZoneCellAssignment {
    #[inline] pub fn resolution(&self) -> u8 { u8::from(self.h3_cell.resolution()) }
}

pub fn write_assignments(rows: &[ZoneCellAssignment], path: &Path) -> Result<()> {
    let text = |f: fn(&ZoneCellAssignment) -> String| rows.iter().map(f).collect::<Vec<_>>();
    let optional = |f: fn(&ZoneCellAssignment) -> Option<String>| rows.iter().map(f).collect::<Vec<_>>();

    let columns: Vec<Column> = vec![
        Series::new("zone_id".into(), text(|r| r.zone_id.to_string())).into(),
        Series::new("h3_cell".into(), text(|r| r.h3_cell.to_string())).into(),
        Series::new("resolution".into(), rows.iter().map(|r| r.resolution() as u32).collect::<Vec<_>>()).into(),
        Series::new("parent_h3".into(), optional(|r| r.parent_h3.map(|c| c.to_string()))).into(),
        Series::new("moku_id".into(), optional(|r| r.moku_id.clone())).into(),
        Series::new("island".into(), optional(|r| r.island.clone())).into(),
        Series::new("version".into(), text(|r| r.version.clone())).into(),
        Series::new("data_source".into(), text(|r| r.data_source.clone())).into(),
        Series::new("provenance".into(), text(|r| r.provenance.clone())).into(),
    ];
    let mut df = DataFrame::new(columns)
        .context("[zone::write_assignments] Failed to assemble assignment frame")?;
    write_csv(&mut df, path)
}

pub fn read_assignments(path: &Path) -> Result<Vec<ZoneCellAssignment>> {
    let df = read_csv(path)?;
    let [zone_ids, cells, resolutions, parents, mokus, islands, versions, sources, provenances] =
        ASSIGNMENT_COLUMNS.map(|name| string_column(&df, name));
    let (zone_ids, cells, resolutions, parents) = (zone_ids?, cells?, resolutions?, parents?);
    let (mokus, islands, versions, sources, provenances) = (mokus?, islands?, versions?, sources?, provenances?);

    (0..df.height())
        .map(|row| {
            let at = || format!("[zone::read_assignments] {} row {}", path.display(), row + 1);
            let zone_id = zone_ids[row].with_context(|| format!("{}: missing zone_id", at()))?;
            let cell_text = cells[row].with_context(|| format!("{}: missing h3_cell", at()))?;
            let h3_cell = parse_cell(cell_text).with_context(|| format!("{}: invalid cell {cell_text:?}", at()))?;
            if let Some(declared) = resolutions[row] {
                let declared: u8 = declared.parse().with_context(|| format!("{}: invalid resolution", at()))?;
                ensure!(declared == u8::from(h3_cell.resolution()), "{}: resolution {declared} does not match {cell_text}", at());
            }
            let parent_h3 = match parents[row] {
                Some(text) => Some(parse_cell(text).with_context(|| format!("{}: invalid parent {text:?}", at()))?),
                None => None,
            };
            Ok(ZoneCellAssignment {
                zone_id: ZoneId::from_raw(zone_id),
                h3_cell,
                parent_h3,
                moku_id: mokus[row].map(str::to_string),
                island: islands[row].map(str::to_string),
                version: versions[row].unwrap_or_default().to_string(),
                data_source: sources[row].unwrap_or_default().to_string(),
                provenance: provenances[row].unwrap_or_default().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexcover::{cell_at, Position, Resolution};

    fn row(zone: &str, lon: f64, lat: f64, moku: Option<&str>) -> ZoneCellAssignment {
        let cell = cell_at(Position::new(lon, lat), Resolution::Ten).unwrap();
        ZoneCellAssignment {
            zone_id: ZoneId::from_raw(zone),
            h3_cell: cell,
            parent_h3: cell.parent(Resolution::Seven),
            moku_id: moku.map(str::to_string),
            island: Some("oahu".into()),
            version: "2026.01".into(),
            data_source: "HART rail line sample 2026".into(),
            provenance: "Line sample res10 from HART Section 1, West center alignment".into(),
        }
    }

    #[test]
    fn blank_links_stay_blank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("RAIL_Zones_H3.csv");
        let rows = vec![row("RAIL_1", -158.05, 21.33, Some("oahu-ewa")), row("RAIL_1", -158.0, 21.35, None)];
        write_assignments(&rows, &path).unwrap();

        let header = std::fs::read_to_string(&path).unwrap();
        assert!(header.starts_with(&ASSIGNMENT_COLUMNS.join(",")));

        let back = read_assignments(&path).unwrap();
        assert_eq!(back, rows);
        assert_eq!(back[1].moku_id, None);
        assert_eq!(back[0].resolution(), 10);
    }

    #[test]
    fn rejects_mismatched_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        let cell = cell_at(Position::new(-158.0, 21.3), Resolution::Nine).unwrap();
        std::fs::write(&path, format!("{}\nIAL_1,{cell},8,,,,v,s,p\n", ASSIGNMENT_COLUMNS.join(","))).unwrap();
        assert!(read_assignments(&path).is_err());
    }
}
