use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

/// A GeoJSON FeatureCollection as read from disk.
///
/// Geometry stays raw JSON here so one unknown or malformed geometry does not
/// fail the whole file; it is typed per feature later.
#[derive(Debug, Deserialize)]
pub(crate) struct RawCollection {
    #[serde(default)]
    pub features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawFeature {
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    #[serde(default)]
    pub geometry: Option<Value>,
}

impl RawFeature {
    pub(crate) fn property(&self, name: &str) -> Option<&Value> {
        self.properties.as_ref()?.get(name).filter(|v| !v.is_null())
    }
}

/// Reads a GeoJSON FeatureCollection from `path`.
pub(crate) fn read_feature_collection(path: &Path) -> Result<RawCollection> {
    let file = File::open(path)
        .with_context(|| format!("[io::geojson] Failed to open GeoJSON file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("[io::geojson] Failed to parse FeatureCollection from {:?}", path))
}

/// Renders a property value as plain text: strings unquoted, integral floats
/// without a fractional part.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Some(i.to_string()),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", f as i64)),
            _ => Some(n.to_string()),
        },
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_geometry_and_properties_parse() {
        let collection: RawCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": null, "geometry": null},
                {"type": "Feature", "properties": {"objectid": 7, "island": null}, "geometry": {"type": "Point", "coordinates": [0, 0]}},
            ]
        })).unwrap();
        assert!(collection.features[0].geometry.is_none());
        assert!(collection.features[0].property("objectid").is_none());
        assert_eq!(collection.features[1].property("objectid"), Some(&json!(7)));
        assert!(collection.features[1].property("island").is_none());
    }

    #[test]
    fn value_text_forms() {
        assert_eq!(value_text(&json!(" DR10-42 ")), Some("DR10-42".into()));
        assert_eq!(value_text(&json!(12)), Some("12".into()));
        assert_eq!(value_text(&json!(12.0)), Some("12".into()));
        assert_eq!(value_text(&json!(1.5)), Some("1.5".into()));
        assert_eq!(value_text(&json!("")), None);
        assert_eq!(value_text(&Value::Null), None);
    }
}
