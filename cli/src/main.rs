mod cli;
mod commands;

use std::process::ExitCode;

use cli::{Cli, Commands};
use commands::{backbone, generate, link, load, pathways};
use tracing_subscriber::EnvFilter;
use zonegraph::StoreError;

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Backbone(args) => backbone::run(cli, args),
        Commands::Generate(args) => generate::run(cli, args),
        Commands::Load(args) => load::run(cli, args),
        Commands::Link(args) => link::run(cli, args),
        Commands::Pathways(args) => pathways::run(cli, args),
    }
}

fn main() -> ExitCode {
    use clap::Parser;

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            // 2: store unavailable or write failed, 3: key conflict
            let code = e.downcast_ref::<StoreError>().map_or(1, StoreError::exit_code);
            ExitCode::from(code)
        }
    }
}
