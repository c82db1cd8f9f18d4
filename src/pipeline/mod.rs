//! `generate`: GeoJSON sources to zone/cell assignment CSVs.

mod generate;
mod report;

pub use generate::{process_source, read_outputs, run, SourceOutput};
pub use report::{RunReport, SkipReason, SourceReport};
