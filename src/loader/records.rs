use serde_json::{json, Value};

use crate::backbone::{BackboneEntry, Partition};
use crate::store::Properties;
use crate::zone::{ZoneCellAssignment, ZoneRecord};
use hexcover::CellIndex;

/// Per-source values stamped on every zone node.
#[derive(Debug, Clone, Copy)]
pub struct SourceMeta<'a> {
    pub zone_type: &'a str,
    pub data_source: &'a str,
    pub version: &'a str,
}

/// Turn an arbitrary attribute name into a property name.
pub fn property_name(raw: &str) -> String {
    let mut name: String = raw.trim().chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name.truncate(64);
    name
}

fn insert_some(props: &mut Properties, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        props.insert(key.to_string(), Value::String(value.to_string()));
    }
}

pub(crate) fn zone_node(record: &ZoneRecord, meta: SourceMeta<'_>) -> Properties {
    let mut props = Properties::new();
    props.insert("zone_id".into(), json!(record.zone_id.as_str()));
    insert_some(&mut props, "name", record.name.as_deref());
    insert_some(&mut props, "island", record.island.as_deref());
    props.insert("zone_type".into(), json!(meta.zone_type));
    props.insert("data_source".into(), json!(meta.data_source));
    props.insert("version".into(), json!(meta.version));
    for (key, value) in &record.attributes {
        props.entry(property_name(key)).or_insert_with(|| json!(value));
    }
    props
}

pub(crate) fn zone_type_node(meta: SourceMeta<'_>) -> Properties {
    let mut props = Properties::new();
    props.insert("id".into(), json!(meta.zone_type));
    props
}

/// Structural attributes of a fine cell. Only values fixed by the cell
/// itself are set, so every zone sharing the cell produces the same record.
pub(crate) fn cell_node(row: &ZoneCellAssignment) -> Properties {
    let mut props = Properties::new();
    props.insert("h3_cell".into(), json!(row.h3_cell.to_string()));
    props.insert("resolution".into(), json!(row.resolution()));
    if let Some(parent) = row.parent_h3.filter(|p| *p != row.h3_cell) {
        props.insert("parent_h3".into(), json!(parent.to_string()));
    }
    if let Some(moku_id) = row.moku_id.as_deref() {
        props.insert("moku_id".into(), json!(moku_id));
        insert_some(&mut props, "island", row.island.as_deref());
    }
    props
}

pub(crate) fn backbone_cell_node(cell: CellIndex, entry: &BackboneEntry) -> Properties {
    let mut props = Properties::new();
    props.insert("h3_cell".into(), json!(cell.to_string()));
    props.insert("resolution".into(), json!(u8::from(cell.resolution())));
    props.insert("moku_id".into(), json!(entry.moku_id));
    insert_some(&mut props, "moku_name", entry.moku_name.as_deref());
    insert_some(&mut props, "island", entry.island.as_deref());
    props
}

pub(crate) fn partition_node(partition: &Partition) -> Properties {
    let mut props = Properties::new();
    props.insert("moku_id".into(), json!(partition.moku_id));
    insert_some(&mut props, "name", partition.name.as_deref());
    insert_some(&mut props, "island", partition.island.as_deref());
    props
}
