//! The coarse cell partition every finer cell is joined against.

mod build;
mod table;

pub use build::{build_backbone, build_from_districts, BackboneBuild, District};
pub use table::{Anchor, BackboneEntry, BackboneTable, Claim, Partition};
