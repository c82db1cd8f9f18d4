mod manifest;
mod source;

pub use manifest::{FileHash, RunManifest};
pub use source::{BackboneSpec, Filter, IdRule, PipelineConfig, SourceSpec};
