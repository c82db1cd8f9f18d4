use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use hexcover::Geometry;
use polars::prelude::{Column, DataFrame, NamedFrom, Series};

use crate::common::{read_csv, string_column, value_text, write_csv, RawFeature};
use crate::config::SourceSpec;
use crate::zone::{normalize_island, ZoneId};

/// Typed view of a feature's geometry member.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    Valid(Geometry),
    Null,
    /// Present but not one of the supported geometry types, or badly shaped.
    Malformed(String),
}

/// One input feature after id, name and island extraction.
#[derive(Debug, Clone)]
pub struct ZoneFeature {
    pub zone_id: ZoneId,
    /// Source identifier text used in provenance.
    pub source_ref: String,
    pub name: Option<String>,
    pub island: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub geometry: FeatureGeometry,
}

impl ZoneFeature {
    /// `None` when an id property is missing.
    pub(crate) fn from_raw(raw: RawFeature, spec: &SourceSpec) -> Option<Self> {
        let parts = spec.id.properties.iter()
            .map(|p| raw.property(p).and_then(value_text))
            .collect::<Option<Vec<_>>>()?;
        let zone_id = if spec.id.omit_zero_suffix {
            ZoneId::without_zero_suffix(&spec.prefix, &parts)
        } else {
            ZoneId::new(&spec.prefix, &parts)
        };

        let name = spec.name.iter().find_map(|p| raw.property(p).and_then(value_text));
        let island = spec.island_property.as_deref()
            .and_then(|p| raw.property(p))
            .and_then(value_text)
            .or_else(|| spec.island.clone())
            .and_then(|i| normalize_island(&i));
        let attributes = spec.attributes.iter()
            .filter_map(|p| Some((p.clone(), raw.property(p).and_then(value_text)?)))
            .collect();

        let geometry = match raw.geometry {
            None | Some(serde_json::Value::Null) => FeatureGeometry::Null,
            Some(value) => match serde_json::from_value::<Geometry>(value) {
                Ok(geometry) => FeatureGeometry::Valid(geometry),
                Err(e) => FeatureGeometry::Malformed(e.to_string()),
            },
        };

        Some(Self { zone_id, source_ref: parts.join(" "), name, island, attributes, geometry })
    }

    pub fn record(&self) -> ZoneRecord {
        ZoneRecord {
            zone_id: self.zone_id.clone(),
            name: self.name.clone(),
            island: self.island.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

/// Zone metadata row: `zone_id,name,island,<attributes...>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRecord {
    pub zone_id: ZoneId,
    pub name: Option<String>,
    pub island: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

pub fn write_zones(records: &[ZoneRecord], attributes: &[String], path: &Path) -> Result<()> {
    let mut columns: Vec<Column> = vec![
        Series::new("zone_id".into(), records.iter().map(|r| r.zone_id.to_string()).collect::<Vec<_>>()).into(),
        Series::new("name".into(), records.iter().map(|r| r.name.clone()).collect::<Vec<_>>()).into(),
        Series::new("island".into(), records.iter().map(|r| r.island.clone()).collect::<Vec<_>>()).into(),
    ];
    for attribute in attributes {
        let values = records.iter().map(|r| r.attributes.get(attribute).cloned()).collect::<Vec<_>>();
        columns.push(Series::new(attribute.as_str().into(), values).into());
    }
    let mut df = DataFrame::new(columns)
        .context("[zone::write_zones] Failed to assemble zones frame")?;
    write_csv(&mut df, path)
}

pub fn read_zones(path: &Path) -> Result<Vec<ZoneRecord>> {
    let df = read_csv(path)?;
    let ids = string_column(&df, "zone_id")?;
    let names = string_column(&df, "name")?;
    let islands = string_column(&df, "island")?;
    let extra = df.get_column_names().into_iter()
        .map(|name| name.to_string())
        .filter(|name| !matches!(name.as_str(), "zone_id" | "name" | "island"))
        .collect::<Vec<_>>();
    let extra_values = extra.iter()
        .map(|name| string_column(&df, name))
        .collect::<Result<Vec<_>>>()?;

    ids.into_iter().enumerate()
        .map(|(row, id)| {
            let id = id.with_context(|| format!("[zone::read_zones] Row {} of {} has no zone_id", row + 1, path.display()))?;
            let attributes = extra.iter().zip(&extra_values)
                .filter_map(|(name, values)| Some((name.clone(), values[row]?.to_string())))
                .collect();
            Ok(ZoneRecord {
                zone_id: ZoneId::from_raw(id),
                name: names[row].map(str::to_string),
                island: islands[row].map(str::to_string),
                attributes,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::RawCollection;
    use serde_json::json;

    fn campus_spec() -> SourceSpec {
        serde_json::from_value(json!({
            "prefix": "UNI",
            "input": "campuses.geojson",
            "id": {"properties": ["inst_id", "camp_id"], "omit_zero_suffix": true},
            "strategy": "point",
            "resolution": 14,
            "name": ["camp_name", "inst_name"],
            "island_property": "island",
            "attributes": ["inst_url", "city"],
            "zone_type": "education",
            "data_source": "PostSecondary intrazone 2026",
            "provenance": "{method} res{resolution} from post-secondary campus {zone_id} ({name})",
            "output": "UNI.csv"
        })).unwrap()
    }

    fn features(value: serde_json::Value) -> Vec<RawFeature> {
        serde_json::from_value::<RawCollection>(value).unwrap().features
    }

    #[test]
    fn extracts_id_name_island_and_attributes() {
        let raw = features(json!({"features": [{
            "properties": {"inst_id": 141574, "camp_id": 0, "inst_name": "University of Hawaii at Manoa",
                           "island": "Oahu", "inst_url": "manoa.hawaii.edu"},
            "geometry": {"type": "Point", "coordinates": [-157.8167, 21.2969]}
        }]}));
        let feature = ZoneFeature::from_raw(raw.into_iter().next().unwrap(), &campus_spec()).unwrap();

        assert_eq!(feature.zone_id.as_str(), "UNI_141574");
        assert_eq!(feature.source_ref, "141574 0");
        assert_eq!(feature.name.as_deref(), Some("University of Hawaii at Manoa"));
        assert_eq!(feature.island.as_deref(), Some("oahu"));
        assert_eq!(feature.attributes.get("inst_url").map(String::as_str), Some("manoa.hawaii.edu"));
        assert!(!feature.attributes.contains_key("city"));
        assert!(matches!(feature.geometry, FeatureGeometry::Valid(Geometry::Point(_))));
    }

    #[test]
    fn missing_id_rejects_feature() {
        let raw = features(json!({"features": [{"properties": {"inst_id": 1}, "geometry": null}]}));
        assert!(ZoneFeature::from_raw(raw.into_iter().next().unwrap(), &campus_spec()).is_none());
    }

    #[test]
    fn null_and_unknown_geometry_are_distinguished() {
        let raw = features(json!({"features": [
            {"properties": {"inst_id": 1, "camp_id": 2}, "geometry": null},
            {"properties": {"inst_id": 1, "camp_id": 3}, "geometry": {"type": "GeometryCollection", "geometries": []}},
        ]}));
        let spec = campus_spec();
        let parsed: Vec<_> = raw.into_iter().filter_map(|r| ZoneFeature::from_raw(r, &spec)).collect();
        assert_eq!(parsed[0].geometry, FeatureGeometry::Null);
        assert!(matches!(parsed[1].geometry, FeatureGeometry::Malformed(_)));
        assert_eq!(parsed[1].zone_id.as_str(), "UNI_1_3");
    }

    #[test]
    fn zones_csv_keeps_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zones.csv");
        let records = vec![
            ZoneRecord {
                zone_id: ZoneId::from_raw("STA_1"),
                name: Some("East Kapolei".into()),
                island: Some("oahu".into()),
                attributes: BTreeMap::from([("feis_name".to_string(), "East Kapolei".to_string())]),
            },
            ZoneRecord { zone_id: ZoneId::from_raw("STA_2"), name: None, island: None, attributes: BTreeMap::new() },
        ];
        write_zones(&records, &["feis_name".to_string()], &path).unwrap();
        assert_eq!(read_zones(&path).unwrap(), records);
    }
}
