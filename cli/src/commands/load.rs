use anyhow::{Context, Result};
use zonegraph::loader::SourceMeta;
use zonegraph::store::GraphStore;
use zonegraph::{pipeline, BackboneTable, GraphLoader, LoadReport, PipelineConfig};

use crate::commands::{flush, open_loader};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::LoadArgs) -> Result<()> {
    let config = PipelineConfig::load(&args.config)?;
    let mut loader = open_loader(&args.store)?;
    let mut total = LoadReport::default();

    let outcome = load_all(&config, args, &mut loader, &mut total);
    flush("load", &total, outcome.is_err());
    outcome
}

fn load_all<S: GraphStore>(
    config: &PipelineConfig,
    args: &crate::cli::LoadArgs,
    loader: &mut GraphLoader<S>,
    total: &mut LoadReport,
) -> Result<()> {
    if args.backbone {
        let table = BackboneTable::read_csv(&config.backbone.path, config.backbone_resolution()?)?;
        println!("[load] backbone: {} cells", table.len());
        loader.load_backbone(&table, args.partitions, total)?;
    }

    for spec in config.selected(&args.only) {
        let (assignments, zones) = pipeline::read_outputs(spec)
            .with_context(|| format!("[load] source {} (run generate first)", spec.prefix))?;
        let meta = SourceMeta {
            zone_type: &spec.zone_type,
            data_source: &spec.data_source,
            version: spec.version(&config.version),
        };
        println!("[load] {}: {} rows, {} zones", spec.prefix, assignments.len(), zones.len());
        loader.load_source(&assignments, &zones, meta, total)?;
    }
    Ok(())
}
