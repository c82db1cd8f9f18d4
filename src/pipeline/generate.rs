use std::path::Path;

use ahash::{AHashMap, AHashSet};
use anyhow::{bail, Context, Result};
use hexcover::{ancestor, CellIndex, Method, Reducer, Resolution};
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::backbone::BackboneTable;
use crate::batch::Deduplicator;
use crate::common::{ensure_dir_exists, read_feature_collection, value_text, RawFeature};
use crate::config::{PipelineConfig, RunManifest, SourceSpec};
use crate::loader::ZONE;
use crate::pipeline::{RunReport, SkipReason, SourceReport};
use crate::store::StoreError;
use crate::zone::{write_assignments, write_zones, FeatureGeometry, ZoneCellAssignment, ZoneFeature, ZoneId, ZoneRecord};

/// Everything one source produced.
#[derive(Debug, Clone)]
pub struct SourceOutput {
    pub report: SourceReport,
    pub assignments: Vec<ZoneCellAssignment>,
    pub zones: Vec<ZoneRecord>,
}

/// Per-feature result of the parallel reduction step.
enum Reduced {
    Skipped(SkipReason, String),
    Cells { cells: Vec<CellIndex>, method: Method, resolution: Resolution, refined: bool, dropped: usize },
}

/// Finer resolution for zones whose primary reduction has fewer than `below` cells.
#[derive(Debug, Clone, Copy)]
struct Refinement {
    resolution: Resolution,
    below: usize,
}

fn reduce_feature(feature: &ZoneFeature, reducer: Reducer, refine: Option<Refinement>) -> Reduced {
    let geometry = match &feature.geometry {
        FeatureGeometry::Valid(geometry) => geometry,
        FeatureGeometry::Null => return Reduced::Skipped(SkipReason::NullGeometry, "geometry is null".into()),
        FeatureGeometry::Malformed(e) => return Reduced::Skipped(SkipReason::MalformedGeometry, e.clone()),
    };
    let reduction = match reducer.reduce(geometry) {
        Ok(reduction) => reduction,
        Err(skip) => return Reduced::Skipped(skip.into(), skip.to_string()),
    };
    match refine {
        Some(finer) if reduction.cells.len() < finer.below => match reducer.at(finer.resolution).reduce(geometry) {
            Ok(fine) => Reduced::Cells {
                cells: fine.cells,
                method: fine.method,
                resolution: finer.resolution,
                refined: true,
                dropped: fine.dropped,
            },
            Err(skip) => Reduced::Skipped(skip.into(), skip.to_string()),
        },
        _ => Reduced::Cells {
            cells: reduction.cells,
            method: reduction.method,
            resolution: reducer.resolution(),
            refined: false,
            dropped: reduction.dropped,
        },
    }
}

fn passes_filters(raw: &RawFeature, spec: &SourceSpec) -> bool {
    spec.filters.iter().all(|filter| {
        raw.property(&filter.property).and_then(value_text) == value_text(&filter.equals)
    })
}

/// Read, filter and reduce one source, joining every cell to the backbone.
pub fn process_source(spec: &SourceSpec, backbone: &BackboneTable, version: &str, pool: &ThreadPool) -> Result<SourceOutput> {
    let collection = read_feature_collection(&spec.input)?;
    let reducer = Reducer::new(spec.strategy, spec.resolution()?)
        .with_containment(spec.containment)
        .with_rings(spec.rings);
    let refine = spec.refine_resolution()?.map(|resolution| Refinement { resolution, below: spec.refine_below });
    let parent_resolution = spec.parent_resolution()?;
    let version = spec.version(version);

    let mut report = SourceReport::new(&spec.prefix);
    report.features = collection.features.len();

    let mut source_keys = Deduplicator::new();
    let mut features = Vec::with_capacity(collection.features.len());
    for (index, raw) in collection.features.into_iter().enumerate() {
        if !passes_filters(&raw, spec) {
            report.filtered += 1;
            continue;
        }
        if !spec.dedup_on.is_empty() {
            let key: Vec<Option<String>> = spec.dedup_on.iter().map(|p| raw.property(p).and_then(value_text)).collect();
            if !source_keys.admit(key) {
                report.duplicates += 1;
                continue;
            }
        }
        match ZoneFeature::from_raw(raw, spec) {
            Some(feature) => features.push(feature),
            None => {
                warn!(source = %spec.prefix, feature = index, reason = %SkipReason::MissingId, "skipping feature");
                report.skip(SkipReason::MissingId);
            }
        }
    }

    let reduced: Vec<Reduced> = pool.install(|| {
        features.par_iter().map(|feature| reduce_feature(feature, reducer, refine)).collect()
    });

    let mut pairs: Deduplicator<(ZoneId, CellIndex)> = Deduplicator::new();
    let mut described: AHashMap<ZoneId, ZoneRecord> = AHashMap::new();
    let mut distinct_cells = AHashSet::new();
    let mut assignments = Vec::new();
    let mut zones = Vec::new();

    for (feature, outcome) in features.iter().zip(reduced) {
        let (cells, method, resolution) = match outcome {
            Reduced::Skipped(reason, detail) => {
                warn!(source = %spec.prefix, zone_id = %feature.zone_id, %reason, %detail, "skipping feature");
                report.skip(reason);
                continue;
            }
            Reduced::Cells { cells, method, resolution, refined, dropped } => {
                report.dropped_parts += dropped;
                if refined {
                    report.refined += 1;
                    debug!(zone_id = %feature.zone_id, %resolution, "refined to finer resolution");
                }
                (cells, method, resolution)
            }
        };
        let record = feature.record();
        match described.get(&feature.zone_id) {
            Some(first) if *first != record => {
                return Err(StoreError::KeyConflict {
                    label: ZONE.into(),
                    key: "zone_id".into(),
                    value: feature.zone_id.to_string(),
                    detail: format!("{} features with different metadata share this id", spec.prefix),
                }
                .into());
            }
            Some(_) => {}
            None => {
                described.insert(feature.zone_id.clone(), record.clone());
                zones.push(record);
            }
        }
        if cells.is_empty() {
            warn!(source = %spec.prefix, zone_id = %feature.zone_id, "feature covers no cell");
            report.uncovered += 1;
            continue;
        }

        let provenance = spec.provenance(
            &method.to_string(),
            resolution,
            &feature.source_ref,
            feature.zone_id.as_str(),
            feature.name.as_deref(),
        );
        for cell in cells {
            if !pairs.admit((feature.zone_id.clone(), cell)) {
                continue;
            }
            let entry = backbone.resolve(cell).entry;
            let island = entry.and_then(|e| e.island.clone()).or_else(|| feature.island.clone());
            if entry.is_none() {
                report.unlinked += 1;
            }
            *report.by_region.entry(island.clone().unwrap_or_else(|| "unknown".into())).or_default() += 1;
            distinct_cells.insert(cell);
            assignments.push(ZoneCellAssignment {
                zone_id: feature.zone_id.clone(),
                h3_cell: cell,
                parent_h3: ancestor(cell, parent_resolution),
                moku_id: entry.map(|e| e.moku_id.clone()),
                island,
                version: version.to_string(),
                data_source: spec.data_source.clone(),
                provenance: provenance.clone(),
            });
        }
    }

    report.zones = zones.len();
    report.rows = assignments.len();
    report.unique_cells = distinct_cells.len();
    info!(
        source = %spec.prefix,
        features = report.features,
        rows = report.rows,
        unique_cells = report.unique_cells,
        skipped = report.skipped_total(),
        unlinked = report.unlinked,
        "source reduced"
    );
    Ok(SourceOutput { report, assignments, zones })
}

pub(crate) fn build_pool(threads: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("[pipeline] Failed to build worker pool")
}

/// Generate assignment CSVs for the selected sources and write the manifest.
///
/// `threads == 0` uses the available parallelism.
pub fn run(config: &PipelineConfig, threads: usize, only: &[String]) -> Result<RunReport> {
    let sources: Vec<&SourceSpec> = config.selected(only).collect();
    if sources.is_empty() {
        bail!("[pipeline] No sources match {only:?}");
    }
    ensure_dir_exists(&config.output_dir)?;

    let backbone = BackboneTable::read_csv(&config.backbone.path, config.backbone_resolution()?)?;
    let pool = build_pool(threads)?;
    let mut manifest = RunManifest::new(&config.version);
    let mut report = RunReport::default();

    for spec in sources {
        let output = process_source(spec, &backbone, &config.version, &pool)
            .with_context(|| format!("[pipeline] source {}", spec.prefix))?;
        write_assignments(&output.assignments, &spec.output)?;
        manifest.add_file(&config.output_dir, &spec.output)?;
        report.outputs.push(spec.output.clone());
        if let Some(path) = &spec.zones_output {
            write_zones(&output.zones, &spec.attributes, path)?;
            manifest.add_file(&config.output_dir, path)?;
            report.outputs.push(path.clone());
        }
        manifest.sources.push(output.report.clone());
        report.sources.push(output.report);
    }

    report.manifest = config.output_dir.join("manifest.json");
    manifest.write(&report.manifest)?;
    Ok(report)
}

/// Load a source's outputs back for the loader.
pub fn read_outputs(spec: &SourceSpec) -> Result<(Vec<ZoneCellAssignment>, Vec<ZoneRecord>)> {
    let assignments = crate::zone::read_assignments(&spec.output)?;
    let zones = match &spec.zones_output {
        Some(path) if Path::new(path).exists() => crate::zone::read_zones(path)?,
        _ => Vec::new(),
    };
    Ok((assignments, zones))
}
