use std::path::Path;

use serde_json::json;
use zonegraph::backbone::{build_from_districts, District};
use zonegraph::config::{PipelineConfig, RunManifest};
use zonegraph::hexcover::{cell_at, Position, Resolution};
use zonegraph::pipeline::{self, SkipReason};
use zonegraph::zone::{read_assignments, read_zones};
use zonegraph::StoreError;

fn write_json(path: &Path, value: serde_json::Value) {
    std::fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

fn square(lon: f64, lat: f64, half: f64) -> serde_json::Value {
    json!({
        "type": "Polygon",
        "coordinates": [[
            [lon - half, lat - half], [lon + half, lat - half],
            [lon + half, lat + half], [lon - half, lat + half], [lon - half, lat - half]
        ]]
    })
}

/// Backbone with one district around (0.5, 0.5) and a config with one
/// centroid source.
fn fixture(dir: &Path, features: serde_json::Value) -> PipelineConfig {
    fixture_with(dir, features, json!({}))
}

/// Same as `fixture`, with `overrides` merged into the source entry.
fn fixture_with(dir: &Path, features: serde_json::Value, overrides: serde_json::Value) -> PipelineConfig {
    let district = District {
        moku_id: "center".into(),
        name: Some("Center".into()),
        island: Some("Oʻahu".into()),
        geojson: Some(square(0.5, 0.5, 0.3).to_string()),
    };
    let build = build_from_districts([district], Resolution::Seven).unwrap();
    build.table.write_csv(&dir.join("backbone.csv")).unwrap();

    write_json(&dir.join("zones.geojson"), json!({"type": "FeatureCollection", "features": features}));
    let mut source = json!({
        "prefix": "GOV",
        "input": "zones.geojson",
        "id": {"properties": ["objectid"]},
        "strategy": "centroid",
        "resolution": 8,
        "name": ["name"],
        "attributes": ["acres"],
        "zone_type": "gov",
        "data_source": "test parcels",
        "provenance": "{method} res{resolution} from parcel {id}",
        "output": "GOV_Zones_H3.csv",
        "zones_output": "GOV_Zones.csv"
    });
    if let (Some(source), serde_json::Value::Object(overrides)) = (source.as_object_mut(), overrides) {
        source.extend(overrides);
    }
    write_json(&dir.join("config.json"), json!({
        "version": "2026.01",
        "backbone": {"path": "backbone.csv"},
        "output_dir": "out",
        "sources": [source]
    }));
    PipelineConfig::load(&dir.join("config.json")).unwrap()
}

#[test]
fn unit_square_joins_backbone_partition() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), json!([
        {"type": "Feature", "properties": {"objectid": 1, "name": "Unit", "acres": 10.0}, "geometry": square(0.5, 0.5, 0.5)}
    ]));

    let report = pipeline::run(&config, 1, &[]).unwrap();
    assert_eq!(report.rows(), 1);

    let rows = read_assignments(&config.output_dir.join("GOV_Zones_H3.csv")).unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.zone_id.as_str(), "GOV_1");
    assert_eq!(Some(row.h3_cell), cell_at(Position::new(0.4, 0.4), Resolution::Eight));
    assert_eq!(row.resolution(), 8);
    assert_eq!(row.moku_id.as_deref(), Some("center"));
    assert_eq!(row.island.as_deref(), Some("oahu"));
    assert_eq!(row.parent_h3, row.h3_cell.parent(Resolution::Seven));
    assert_eq!(row.provenance, "Centroid res8 from parcel 1");
    assert_eq!(row.version, "2026.01");

    let zones = read_zones(&config.output_dir.join("GOV_Zones.csv")).unwrap();
    assert_eq!(zones[0].name.as_deref(), Some("Unit"));
    assert_eq!(zones[0].attributes.get("acres").map(String::as_str), Some("10"));
}

#[test]
fn null_geometry_is_counted_and_yields_no_rows() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), json!([
        {"type": "Feature", "properties": {"objectid": 1}, "geometry": null},
        {"type": "Feature", "properties": {"objectid": 2}, "geometry": {"type": "Point", "coordinates": [0.5, 0.5]}},
        {"type": "Feature", "properties": {}, "geometry": square(0.5, 0.5, 0.1)}
    ]));

    let report = pipeline::run(&config, 2, &[]).unwrap();
    let source = &report.sources[0];
    assert_eq!(source.features, 3);
    assert_eq!(source.skipped.get(&SkipReason::NullGeometry), Some(&1));
    assert_eq!(source.skipped.get(&SkipReason::UnsupportedGeometry), Some(&1));
    assert_eq!(source.skipped.get(&SkipReason::MissingId), Some(&1));
    assert_eq!(source.rows, 0);

    let rows = read_assignments(&config.output_dir.join("GOV_Zones_H3.csv")).unwrap();
    assert!(rows.is_empty());

    let manifest = RunManifest::read(&report.manifest).unwrap();
    assert_eq!(manifest.sources[0].skipped_total(), 3);
    assert!(manifest.files.contains_key("GOV_Zones_H3.csv"));
}

#[test]
fn zone_outside_backbone_stays_unlinked() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), json!([
        {"type": "Feature", "properties": {"objectid": 9}, "geometry": square(40.0, 10.0, 0.01)}
    ]));

    let report = pipeline::run(&config, 1, &[]).unwrap();
    assert_eq!(report.sources[0].unlinked, 1);

    let rows = read_assignments(&config.output_dir.join("GOV_Zones_H3.csv")).unwrap();
    assert_eq!(rows[0].moku_id, None);
    assert_eq!(rows[0].island, None);
    assert!(rows[0].parent_h3.is_some());
}

#[test]
fn unknown_source_selection_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), json!([]));
    assert!(pipeline::run(&config, 1, &["RAIL".to_string()]).is_err());
}

#[test]
fn bundled_source_config_validates() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/sources.json");
    let config = PipelineConfig::load(&path).unwrap();
    assert_eq!(config.sources.len(), 10);
    assert_eq!(config.selected(&["uni".to_string()]).count(), 1);
}

#[test]
fn open_unit_square_centroid_joins_partition_at_its_center() {
    let dir = tempfile::tempdir().unwrap();
    let open_square = json!({"type": "Polygon", "coordinates": [[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]]});
    let config = fixture(dir.path(), json!([
        {"type": "Feature", "properties": {"objectid": 1, "name": "Unit"}, "geometry": open_square}
    ]));

    pipeline::run(&config, 1, &[]).unwrap();

    let rows = read_assignments(&config.output_dir.join("GOV_Zones_H3.csv")).unwrap();
    assert_eq!(rows.len(), 1);
    let center = cell_at(Position::new(0.5, 0.5), Resolution::Eight).unwrap();
    assert_eq!(rows[0].h3_cell, center);
    assert_eq!(rows[0].parent_h3, center.parent(Resolution::Seven));
    assert_eq!(rows[0].moku_id.as_deref(), Some("center"));
}

#[test]
fn small_polyfill_zone_is_refined_to_finer_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_with(
        dir.path(),
        json!([
            {"type": "Feature", "properties": {"objectid": 1}, "geometry": square(0.5, 0.5, 0.0005)},
            {"type": "Feature", "properties": {"objectid": 2}, "geometry": square(0.5, 0.5, 0.1)}
        ]),
        json!({"strategy": "polyfill", "refine_resolution": 9, "refine_below": 16}),
    );

    let report = pipeline::run(&config, 2, &[]).unwrap();
    assert_eq!(report.sources[0].refined, 1);
    assert_eq!(report.sources[0].uncovered, 0);

    let rows = read_assignments(&config.output_dir.join("GOV_Zones_H3.csv")).unwrap();
    let small: Vec<_> = rows.iter().filter(|r| r.zone_id.as_str() == "GOV_1").collect();
    let large: Vec<_> = rows.iter().filter(|r| r.zone_id.as_str() == "GOV_2").collect();
    assert!(!small.is_empty());
    assert!(small.iter().all(|r| r.resolution() == 9));
    assert!(small.iter().all(|r| r.provenance == "Polyfill res9 from parcel 1"));
    assert!(large.len() >= 16);
    assert!(large.iter().all(|r| r.resolution() == 8));
}

#[test]
fn distinct_features_sharing_an_id_are_a_key_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), json!([
        {"type": "Feature", "properties": {"objectid": 1, "name": "Kapolei"}, "geometry": square(0.5, 0.5, 0.1)},
        {"type": "Feature", "properties": {"objectid": 1, "name": "Kailua"}, "geometry": square(0.6, 0.6, 0.1)}
    ]));

    let err = pipeline::run(&config, 1, &[]).unwrap_err();
    let conflict = err.downcast_ref::<StoreError>().unwrap();
    assert!(matches!(conflict, StoreError::KeyConflict { value, .. } if value == "GOV_1"));
    assert_eq!(conflict.exit_code(), 3);
}

#[test]
fn identical_parts_sharing_an_id_merge_into_one_zone() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), json!([
        {"type": "Feature", "properties": {"objectid": 1, "name": "Kapolei"}, "geometry": square(0.4, 0.4, 0.05)},
        {"type": "Feature", "properties": {"objectid": 1, "name": "Kapolei"}, "geometry": square(0.6, 0.6, 0.05)}
    ]));

    let report = pipeline::run(&config, 1, &[]).unwrap();
    assert_eq!(report.sources[0].zones, 1);
    assert_eq!(report.sources[0].rows, 2);
}
