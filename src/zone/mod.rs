mod assignment;
mod feature;
mod id;
mod island;

pub use assignment::{read_assignments, write_assignments, ZoneCellAssignment, ASSIGNMENT_COLUMNS};
pub use feature::{read_zones, write_zones, FeatureGeometry, ZoneFeature, ZoneRecord};
pub use id::ZoneId;
pub use island::normalize_island;
