#![doc = "zonegraph public API"]
mod common;

pub mod backbone;
pub mod batch;
pub mod config;
pub mod loader;
pub mod pathways;
pub mod pipeline;
pub mod store;
pub mod zone;

#[doc(inline)]
pub use backbone::{build_backbone, BackboneTable};

#[doc(inline)]
pub use config::{PipelineConfig, SourceSpec};

#[doc(inline)]
pub use loader::{GraphLoader, LoadReport};

#[doc(inline)]
pub use pipeline::{RunReport, SourceReport};

#[doc(inline)]
pub use store::{GraphStore, MemGraph, StoreError};

pub use hexcover;
