//! Graph store seam: the trait the loader writes through and its backends.

mod error;
mod graph;
mod ident;
mod mem;
#[cfg(feature = "neo4j")]
mod neo4j;

pub use error::StoreError;
pub use graph::{Endpoint, GraphStore, LinkOutcome, LinkPair, LinkSpec, Properties, UpsertOutcome};
pub use ident::validate_identifier;
pub use mem::MemGraph;
#[cfg(feature = "neo4j")]
pub use neo4j::{Neo4jConfig, Neo4jStore};
