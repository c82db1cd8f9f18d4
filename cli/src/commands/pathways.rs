use anyhow::Result;
use zonegraph::pathways::{build_pathways, load_pathways, read_programs};
use zonegraph::LoadReport;

use crate::commands::{flush, open_loader};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::PathwaysArgs) -> Result<()> {
    let programs = read_programs(&args.programs)?;
    println!("[pathways] {} programs in {}", programs.len(), args.programs.display());

    let graph = build_pathways(&programs)?;
    for (key, reason) in &graph.unresolved {
        println!("[pathways] skipped {key:?}: {reason}");
    }

    let mut loader = open_loader(&args.store)?;
    let mut report = LoadReport::default();
    let outcome = load_pathways(&mut loader, &graph, &mut report);
    flush("pathways", &report, outcome.is_err());
    Ok(outcome?)
}
