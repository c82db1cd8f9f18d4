use std::path::{Path, PathBuf};

use ahash::AHashSet;
use anyhow::{bail, ensure, Context, Result};
use hexcover::{parse_resolution, Containment, Resolution, RingSelection, Strategy};
use serde::Deserialize;
use serde_json::Value;

use crate::common::resolve_path;

const DEFAULT_BACKBONE_RESOLUTION: u8 = 7;

/// Placeholders a provenance template may use.
const PROVENANCE_FIELDS: [&str; 5] = ["method", "resolution", "id", "zone_id", "name"];

/// Top-level pipeline configuration, read from JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Version tag written on every output row, e.g. "2026.01".
    pub version: String,
    pub backbone: BackboneSpec,
    /// Directory for generated CSVs and `manifest.json`.
    pub output_dir: PathBuf,
    pub sources: Vec<SourceSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackboneSpec {
    /// Backbone CSV (`h3_index,resolution,moku_id,moku_name,island`).
    pub path: PathBuf,
    #[serde(default = "default_backbone_resolution")]
    pub resolution: u8,
    /// District table (`moku_id,name,island,geojson`) the backbone is built from.
    #[serde(default)]
    pub districts: Option<PathBuf>,
}

fn default_backbone_resolution() -> u8 { DEFAULT_BACKBONE_RESOLUTION }

fn default_refine_below() -> usize { 1 }

/// One zone source: where its features come from and how they become cells.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSpec {
    /// Zone id prefix, also the source's name in reports ("IAL", "RAIL").
    pub prefix: String,
    pub input: PathBuf,
    pub id: IdRule,
    pub strategy: Strategy,
    pub resolution: u8,
    /// Finer resolution retried for zones the primary polyfill covers with
    /// fewer than `refine_below` cells.
    #[serde(default)]
    pub refine_resolution: Option<u8>,
    #[serde(default = "default_refine_below")]
    pub refine_below: usize,
    /// Resolution of the `parent_h3` column.
    #[serde(default = "default_backbone_resolution")]
    pub parent_resolution: u8,
    #[serde(default)]
    pub containment: Containment,
    #[serde(default)]
    pub rings: RingSelection,
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Keep only the first feature per tuple of these properties.
    #[serde(default)]
    pub dedup_on: Vec<String>,
    /// Name candidates, first non-empty wins.
    #[serde(default)]
    pub name: Vec<String>,
    #[serde(default)]
    pub island_property: Option<String>,
    /// Island for every feature of a single-island source.
    #[serde(default)]
    pub island: Option<String>,
    /// Extra properties copied to zone metadata.
    #[serde(default)]
    pub attributes: Vec<String>,
    /// `ZoneType` id the source's zones belong to.
    pub zone_type: String,
    pub data_source: String,
    /// Template with `{method}`, `{resolution}`, `{id}`, `{zone_id}`, `{name}`.
    pub provenance: String,
    /// Overrides the pipeline version tag for this source.
    #[serde(default)]
    pub version: Option<String>,
    pub output: PathBuf,
    #[serde(default)]
    pub zones_output: Option<PathBuf>,
}

/// How a zone id is built from feature properties.
#[derive(Debug, Clone, Deserialize)]
pub struct IdRule {
    pub properties: Vec<String>,
    /// Drop a trailing part equal to "0" (main campus vs branch).
    #[serde(default)]
    pub omit_zero_suffix: bool,
}

/// Keep only features whose `property` equals `equals`.
#[derive(Debug, Clone, Deserialize)]
pub struct Filter {
    pub property: String,
    pub equals: Value,
}

impl PipelineConfig {
    /// Reads and validates a config file; relative paths are resolved against
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("[config] Failed to read {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&text)
            .with_context(|| format!("[config] Failed to parse {}", path.display()))?;
        let base = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        self.output_dir = resolve_path(base, &self.output_dir);
        self.backbone.path = resolve_path(base, &self.backbone.path);
        if let Some(districts) = &mut self.backbone.districts {
            *districts = resolve_path(base, districts);
        }
        for source in &mut self.sources {
            source.input = resolve_path(base, &source.input);
            source.output = resolve_path(&self.output_dir, &source.output);
            if let Some(zones) = &mut source.zones_output {
                *zones = resolve_path(&self.output_dir, zones);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.version.trim().is_empty(), "[config] version must not be empty");
        let backbone = self.backbone_resolution()?;

        let mut prefixes = AHashSet::new();
        for source in &self.sources {
            ensure!(prefixes.insert(source.prefix.as_str()), "[config] duplicate source prefix {:?}", source.prefix);
            source.validate(backbone)
                .with_context(|| format!("[config] source {}", source.prefix))?;
        }
        Ok(())
    }

    pub fn backbone_resolution(&self) -> Result<Resolution> {
        resolution(self.backbone.resolution)
    }

    /// Sources whose prefix is in `only`, or every source when `only` is empty.
    pub fn selected<'a>(&'a self, only: &'a [String]) -> impl Iterator<Item = &'a SourceSpec> + 'a {
        self.sources.iter()
            .filter(move |s| only.is_empty() || only.iter().any(|p| p.eq_ignore_ascii_case(&s.prefix)))
    }
}

impl SourceSpec {
    fn validate(&self, backbone: Resolution) -> Result<()> {
        ensure!(!self.prefix.is_empty(), "prefix must not be empty");
        ensure!(!self.id.properties.is_empty(), "id needs at least one property");
        let primary = self.resolution()?;
        let parent = self.parent_resolution()?;
        ensure!(parent <= primary, "parent_resolution {parent} is finer than resolution {primary}");
        ensure!(backbone <= primary, "backbone resolution {backbone} is finer than resolution {primary}");
        if let Some(refine) = self.refine_resolution()? {
            ensure!(self.strategy == Strategy::Polyfill, "refine_resolution only applies to polyfill");
            ensure!(refine > primary, "refine_resolution {refine} must be finer than {primary}");
            ensure!(self.refine_below > 0, "refine_below must be at least 1");
        }
        for field in placeholders(&self.provenance) {
            if !PROVENANCE_FIELDS.contains(&field) {
                bail!("unknown provenance placeholder {{{field}}}");
            }
        }
        Ok(())
    }

    pub fn resolution(&self) -> Result<Resolution> { resolution(self.resolution) }

    pub fn parent_resolution(&self) -> Result<Resolution> { resolution(self.parent_resolution) }

    pub fn refine_resolution(&self) -> Result<Option<Resolution>> {
        self.refine_resolution.map(resolution).transpose()
    }

    pub fn version<'a>(&'a self, default: &'a str) -> &'a str {
        self.version.as_deref().unwrap_or(default)
    }

    /// Fill the provenance template.
    pub fn provenance(&self, method: &str, resolution: Resolution, id: &str, zone_id: &str, name: Option<&str>) -> String {
        self.provenance
            .replace("{method}", method)
            .replace("{resolution}", &u8::from(resolution).to_string())
            .replace("{id}", id)
            .replace("{zone_id}", zone_id)
            .replace("{name}", name.unwrap_or(""))
    }
}

fn resolution(value: u8) -> Result<Resolution> {
    parse_resolution(value).with_context(|| format!("resolution {value} is outside 0..=15"))
}

fn placeholders(template: &str) -> impl Iterator<Item = &str> {
    template.split('{').skip(1).filter_map(|rest| rest.split_once('}').map(|(field, _)| field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(extra: Value) -> SourceSpec {
        let mut base = json!({
            "prefix": "IAL",
            "input": "ag/ial.geojson",
            "id": {"properties": ["docket_no"]},
            "strategy": "polyfill",
            "resolution": 8,
            "zone_type": "ag",
            "data_source": "IAL polyfill 2026",
            "provenance": "{method} res{resolution} from IAL {id} polygon",
            "output": "IAL_Zones_H3.csv"
        });
        if let (Some(base), Value::Object(extra)) = (base.as_object_mut(), extra) {
            base.extend(extra);
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn defaults_fill_in() {
        let spec = source(json!({}));
        assert_eq!(spec.parent_resolution, 7);
        assert_eq!(spec.containment, Containment::Intersects);
        assert_eq!(spec.rings, RingSelection::All);
        assert!(spec.refine_resolution.is_none());
        assert_eq!(spec.refine_below, 1);
        assert!(spec.validate(Resolution::Seven).is_ok());
    }

    #[test]
    fn provenance_template_fills_fields() {
        let spec = source(json!({}));
        let text = spec.provenance("Polyfill", Resolution::Eight, "DR10-42", "IAL_DR10-42", None);
        assert_eq!(text, "Polyfill res8 from IAL DR10-42 polygon");
    }

    #[test]
    fn rejects_unknown_placeholder() {
        let spec = source(json!({"provenance": "{strategy} from {id}"}));
        assert!(spec.validate(Resolution::Seven).is_err());
    }

    #[test]
    fn rejects_coarse_refinement_and_fine_parent() {
        assert!(source(json!({"refine_resolution": 8})).validate(Resolution::Seven).is_err());
        assert!(source(json!({"parent_resolution": 9})).validate(Resolution::Seven).is_err());
        assert!(source(json!({"refine_resolution": 9})).validate(Resolution::Seven).is_ok());
        assert!(source(json!({"strategy": "centroid", "refine_resolution": 9})).validate(Resolution::Seven).is_err());
        assert!(source(json!({"refine_resolution": 9, "refine_below": 0})).validate(Resolution::Seven).is_err());
    }

    #[test]
    fn load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");
        let config = json!({
            "version": "2026.01",
            "backbone": {"path": "moku/ZoneCell.csv"},
            "output_dir": "out",
            "sources": [{
                "prefix": "HWY",
                "input": "highways/hpms.geojson",
                "id": {"properties": ["objectid"]},
                "strategy": "midpoint",
                "resolution": 8,
                "zone_type": "transport",
                "data_source": "HPMS midpoint 2026",
                "provenance": "{method} res{resolution} from HPMS segment objectid {id}",
                "output": "HWY_Zones_H3.csv"
            }]
        });
        std::fs::write(&path, config.to_string()).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.backbone.path, dir.path().join("moku/ZoneCell.csv"));
        assert_eq!(config.sources[0].input, dir.path().join("highways/hpms.geojson"));
        assert_eq!(config.sources[0].output, dir.path().join("out/HWY_Zones_H3.csv"));
        assert_eq!(config.backbone_resolution().unwrap(), Resolution::Seven);
    }

    #[test]
    fn load_rejects_duplicate_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");
        let one = json!({
            "prefix": "SCH", "input": "a.geojson", "id": {"properties": ["objectid"]},
            "strategy": "point", "resolution": 14, "zone_type": "education",
            "data_source": "Schools", "provenance": "{method}", "output": "a.csv"
        });
        let config = json!({
            "version": "2026.01",
            "backbone": {"path": "b.csv"},
            "output_dir": "out",
            "sources": [one.clone(), one]
        });
        std::fs::write(&path, config.to_string()).unwrap();
        assert!(PipelineConfig::load(&path).is_err());
    }

    #[test]
    fn selected_matches_prefix_case_insensitively() {
        let config = PipelineConfig {
            version: "v".into(),
            backbone: BackboneSpec { path: "b.csv".into(), resolution: 7, districts: None },
            output_dir: "out".into(),
            sources: vec![source(json!({})), source(json!({"prefix": "RAIL"}))],
        };
        let only = vec!["rail".to_string()];
        let picked: Vec<_> = config.selected(&only).map(|s| s.prefix.as_str()).collect();
        assert_eq!(picked, vec!["RAIL"]);
        assert_eq!(config.selected(&[]).count(), 2);
    }
}
