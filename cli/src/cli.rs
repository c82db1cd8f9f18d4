use std::path::PathBuf;

/// Zone-to-cell indexing and graph loading CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "zonegraph", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Build the backbone cell table from a district CSV
    Backbone(BackboneArgs),

    /// Reduce configured sources to zone/cell assignment CSVs
    Generate(GenerateArgs),

    /// Load generated assignments (and optionally the backbone) into the graph
    Load(LoadArgs),

    /// Re-run parent and partition links after new nodes were loaded
    Link(LinkArgs),

    /// Load the career pathways graph from programs.json
    Pathways(PathwaysArgs),
}

#[derive(clap::Args, Debug)]
pub struct BackboneArgs {
    /// District table with `moku_id,name,island,geojson` columns
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub districts: PathBuf,

    /// Output backbone CSV, defaults to "./backbone.csv"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Backbone cell resolution
    #[arg(short, long, default_value_t = 7)]
    pub resolution: u8,
}

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Pipeline config (JSON)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Only these source prefixes (repeatable)
    #[arg(long = "only", value_name = "PREFIX")]
    pub only: Vec<String>,

    /// Worker threads, 0 uses every core
    #[arg(short, long, default_value_t = 0)]
    pub threads: usize,
}

#[derive(clap::Args, Debug)]
pub struct StoreArgs {
    /// Write to an in-memory graph and report what would change
    #[arg(long)]
    pub dry_run: bool,

    /// Records per write batch
    #[arg(long, default_value_t = zonegraph::batch::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

#[derive(clap::Args, Debug)]
pub struct LoadArgs {
    /// Pipeline config (JSON)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Only these source prefixes (repeatable)
    #[arg(long = "only", value_name = "PREFIX")]
    pub only: Vec<String>,

    /// Also load the backbone cells named in the config
    #[arg(long)]
    pub backbone: bool,

    /// With --backbone, also create the partition nodes
    #[arg(long, requires = "backbone")]
    pub partitions: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(clap::Args, Debug)]
pub struct LinkArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(clap::Args, Debug)]
pub struct PathwaysArgs {
    /// programs.json
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub programs: PathBuf,

    #[command(flatten)]
    pub store: StoreArgs,
}
