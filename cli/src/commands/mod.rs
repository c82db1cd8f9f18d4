pub mod backbone;
pub mod generate;
pub mod link;
pub mod load;
pub mod pathways;

use anyhow::Result;
use zonegraph::store::GraphStore;
use zonegraph::{GraphLoader, LoadReport, MemGraph};

use crate::cli::StoreArgs;

/// Loader over the configured store: in memory for dry runs, Neo4j otherwise.
pub(crate) fn open_loader(args: &StoreArgs) -> Result<GraphLoader<Box<dyn GraphStore>>> {
    tracing::debug!(dry_run = args.dry_run, batch_size = args.batch_size, "opening graph store");
    let store: Box<dyn GraphStore> = if args.dry_run {
        println!("[store] dry run, writing to an in-memory graph");
        Box::new(MemGraph::new())
    } else {
        connect(args)?
    };
    Ok(GraphLoader::new(store).with_batch_size(args.batch_size))
}

/// Print what was written, including the batches that landed before a failure.
pub(crate) fn flush(command: &str, report: &LoadReport, failed: bool) {
    if failed {
        println!("[{command}] aborted; written before the failure:");
    }
    print!("{report}");
}

#[cfg(feature = "neo4j")]
fn connect(args: &StoreArgs) -> Result<Box<dyn GraphStore>> {
    use zonegraph::store::{Neo4jConfig, Neo4jStore};

    let config = Neo4jConfig::from_env()?;
    println!("[store] connecting to {}", config.uri);
    Ok(Box::new(Neo4jStore::connect(&config)?.with_link_page(args.batch_size)))
}

#[cfg(not(feature = "neo4j"))]
fn connect(_args: &StoreArgs) -> Result<Box<dyn GraphStore>> {
    Err(zonegraph::StoreError::Unavailable("built without the neo4j feature; use --dry-run".into()).into())
}
