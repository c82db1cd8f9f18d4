//! Career pathways: programs of study, occupations and training, bridged to
//! zone types.

mod load;
mod programs;
mod tables;

pub use load::load_pathways;
pub use programs::{build_pathways, read_programs, PathwayGraph, ProgramEntry, Programs};
pub use tables::{cluster_for_title, program_suffix, slugify, stage, Cluster};
