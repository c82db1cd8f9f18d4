use anyhow::Result;
use zonegraph::{pipeline, PipelineConfig};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::GenerateArgs) -> Result<()> {
    let config = PipelineConfig::load(&args.config)?;

    println!("[generate] writing to {}", config.output_dir.display());
    let report = pipeline::run(&config, args.threads, &args.only)?;
    print!("{report}");
    Ok(())
}
