use anyhow::{Context, Result};
use zonegraph::build_backbone;
use zonegraph::hexcover::parse_resolution;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::BackboneArgs) -> Result<()> {
    let out_path = &args.output.clone().unwrap_or("./backbone.csv".into());
    let resolution = parse_resolution(args.resolution)
        .with_context(|| format!("[backbone] resolution {} is outside 0..=15", args.resolution))?;

    println!("[backbone] filling districts from {} at resolution {}", args.districts.display(), args.resolution);
    let build = build_backbone(&args.districts, resolution)?;
    for (moku_id, reason) in &build.skipped {
        println!("[backbone] skipped {moku_id}: {reason}");
    }

    println!("[backbone] writing {} cells to {}", build.table.len(), out_path.display());
    build.table.write_csv(out_path)?;
    println!(
        "[backbone] {} districts, {} skipped, {} conflicting cells",
        build.districts, build.skipped.len(), build.conflicts,
    );
    Ok(())
}
