use std::path::Path;

use anyhow::Result;
use hexcover::{Containment, Geometry, GeometryKind, Reducer, Resolution, Strategy};
use tracing::{debug, info, warn};

use crate::backbone::{BackboneEntry, BackboneTable, Claim};
use crate::common::{optional_string_column, read_csv, string_column};
use crate::zone::normalize_island;

/// One district row: `moku_id,name,island,geojson`.
#[derive(Debug, Clone)]
pub struct District {
    pub moku_id: String,
    pub name: Option<String>,
    pub island: Option<String>,
    /// Embedded GeoJSON geometry text.
    pub geojson: Option<String>,
}

#[derive(Debug)]
pub struct BackboneBuild {
    pub table: BackboneTable,
    pub districts: usize,
    /// (moku_id, reason) for districts that produced no cells.
    pub skipped: Vec<(String, String)>,
    /// Cells already claimed by an earlier district.
    pub conflicts: usize,
}

/// Reads the district table at `path` and fills each district at `resolution`.
pub fn build_backbone(path: &Path, resolution: Resolution) -> Result<BackboneBuild> {
    let df = read_csv(path)?;
    let ids = string_column(&df, "moku_id")?;
    let names = optional_string_column(&df, "name")?;
    let islands = optional_string_column(&df, "island")?;
    let geojson = string_column(&df, "geojson")?;

    let districts = (0..df.height())
        .filter_map(|row| {
            let Some(moku_id) = ids[row] else {
                warn!(row = row + 1, "district row has no moku_id");
                return None;
            };
            Some(District {
                moku_id: moku_id.to_string(),
                name: names.as_ref().and_then(|n| n[row]).map(str::to_string),
                island: islands.as_ref().and_then(|i| i[row]).map(str::to_string),
                geojson: geojson[row].map(str::to_string),
            })
        })
        .collect::<Vec<_>>();

    build_from_districts(districts, resolution)
}

/// Polyfills every district by cell centre, so neighbouring districts rarely
/// claim the same cell; when they do the first district keeps it.
pub fn build_from_districts(districts: impl IntoIterator<Item = District>, resolution: Resolution) -> Result<BackboneBuild> {
    let reducer = Reducer::new(Strategy::Polyfill, resolution).with_containment(Containment::Centroid);
    let mut build = BackboneBuild { table: BackboneTable::new(resolution), districts: 0, skipped: Vec::new(), conflicts: 0 };

    for district in districts {
        build.districts += 1;
        let cells = match district_cells(&reducer, &district) {
            Ok(cells) => cells,
            Err(reason) => {
                warn!(moku_id = %district.moku_id, %reason, "skipping district");
                build.skipped.push((district.moku_id, reason));
                continue;
            }
        };

        let entry = BackboneEntry {
            moku_id: district.moku_id.clone(),
            moku_name: district.name.clone(),
            island: district.island.as_deref().and_then(normalize_island),
        };
        let mut claimed = 0;
        for cell in cells {
            match build.table.insert(cell, entry.clone())? {
                Claim::New => claimed += 1,
                Claim::Same => {}
                Claim::Conflict => build.conflicts += 1,
            }
        }
        debug!(moku_id = %district.moku_id, cells = claimed, "district filled");
    }

    if build.conflicts > 0 {
        warn!(conflicts = build.conflicts, "cells claimed by more than one district; kept first claim");
    }
    info!(districts = build.districts, cells = build.table.len(), skipped = build.skipped.len(), "backbone built");
    Ok(build)
}

fn district_cells(reducer: &Reducer, district: &District) -> Result<Vec<hexcover::CellIndex>, String> {
    let text = district.geojson.as_deref().ok_or("no geojson data")?;
    let geometry: Geometry = serde_json::from_str(text).map_err(|e| format!("invalid geojson: {e}"))?;
    if !matches!(geometry.kind(), GeometryKind::Polygon | GeometryKind::MultiPolygon) {
        return Err(format!("{} is not a polygon", geometry.kind()));
    }
    let reduction = reducer.reduce(&geometry).map_err(|skip| skip.to_string())?;
    if reduction.cells.is_empty() {
        return Err("polygon covers no cell centre".into());
    }
    Ok(reduction.cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexcover::{cell_at, Position};

    fn square(lon: f64, lat: f64, half: f64) -> String {
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [[
                [lon - half, lat - half], [lon + half, lat - half],
                [lon + half, lat + half], [lon - half, lat + half], [lon - half, lat - half]
            ]]
        }).to_string()
    }

    fn district(id: &str, geojson: Option<String>) -> District {
        District { moku_id: id.into(), name: Some(id.to_uppercase()), island: Some("Big Island".into()), geojson }
    }

    #[test]
    fn fills_districts_and_counts_skips() {
        let districts = vec![
            district("kona", Some(square(-155.9, 19.6, 0.1))),
            district("empty", None),
            district("broken", Some("{not json".into())),
            district("line", Some(r#"{"type": "LineString", "coordinates": [[0, 0], [1, 1]]}"#.into())),
        ];
        let build = build_from_districts(districts, Resolution::Seven).unwrap();

        assert_eq!(build.districts, 4);
        assert_eq!(build.skipped.len(), 3);
        assert!(build.table.len() > 50);
        let center = cell_at(Position::new(-155.9, 19.6), Resolution::Seven).unwrap();
        let entry = build.table.get(center).unwrap();
        assert_eq!(entry.moku_id, "kona");
        assert_eq!(entry.island.as_deref(), Some("hawaii"));
    }

    #[test]
    fn overlapping_districts_keep_first_claim() {
        let districts = vec![
            district("first", Some(square(-155.9, 19.6, 0.1))),
            district("second", Some(square(-155.85, 19.6, 0.1))),
        ];
        let build = build_from_districts(districts, Resolution::Seven).unwrap();
        assert!(build.conflicts > 0);
        let shared = cell_at(Position::new(-155.87, 19.6), Resolution::Seven).unwrap();
        assert_eq!(build.table.get(shared).map(|e| e.moku_id.as_str()), Some("first"));
    }

    #[test]
    fn reads_district_csv_with_embedded_geojson() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moku_districts_rows.csv");
        let geojson = square(-157.9, 21.4, 0.05).replace('"', "\"\"");
        std::fs::write(&path, format!("moku_id,name,island,geojson\newa,Ewa,Oahu,\"{geojson}\"\n")).unwrap();

        let build = build_backbone(&path, Resolution::Seven).unwrap();
        assert_eq!(build.districts, 1);
        assert!(build.skipped.is_empty());
        assert!(build.table.rows().all(|(_, e)| e.moku_id == "ewa" && e.island.as_deref() == Some("oahu")));
    }
}
