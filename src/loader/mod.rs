//! Graph loading: turns zones, assignments and the backbone into node and
//! edge merges against a `GraphStore`.

mod loader;
mod records;
mod report;

pub use loader::{GraphLoader, MOKU, ZONE, ZONE_CELL, ZONE_TYPE};
pub use records::{property_name, SourceMeta};
pub use report::LoadReport;
