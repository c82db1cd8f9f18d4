use anyhow::Result;
use zonegraph::LoadReport;

use crate::commands::{flush, open_loader};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::LinkArgs) -> Result<()> {
    let mut loader = open_loader(&args.store)?;

    println!("[link] linking cells to parents and partitions");
    let mut report = LoadReport::default();
    let outcome = loader.link(&mut report);
    flush("link", &report, outcome.is_err());
    Ok(outcome?)
}
