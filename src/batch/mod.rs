mod batcher;
mod dedup;

pub use batcher::{batches, DEFAULT_BATCH_SIZE};
pub use dedup::{Deduplicator, NodeCollapser};
