use ahash::AHashSet;
use tracing::{debug, info};

use crate::backbone::BackboneTable;
use crate::batch::{batches, NodeCollapser, DEFAULT_BATCH_SIZE};
use crate::loader::records::{backbone_cell_node, cell_node, partition_node, zone_node, zone_type_node, SourceMeta};
use crate::loader::LoadReport;
use crate::store::{Endpoint, GraphStore, LinkPair, LinkSpec, Properties, StoreError};
use crate::zone::{ZoneCellAssignment, ZoneRecord};

pub const ZONE: &str = "Zone";
pub const ZONE_CELL: &str = "ZoneCell";
pub const ZONE_TYPE: &str = "ZoneType";
pub const MOKU: &str = "Moku";

/// Unique keys declared before any write.
const SCHEMA: [(&str, &str); 4] = [(ZONE_CELL, "h3_cell"), (ZONE, "zone_id"), (MOKU, "moku_id"), (ZONE_TYPE, "id")];

fn within() -> LinkSpec {
    LinkSpec::new(Endpoint::new(ZONE_CELL, "moku_id"), "WITHIN", Endpoint::new(MOKU, "moku_id"))
}

fn child_of() -> LinkSpec {
    LinkSpec::new(Endpoint::new(ZONE_CELL, "parent_h3"), "CHILD_OF", Endpoint::new(ZONE_CELL, "h3_cell"))
}

fn has_cell() -> LinkSpec {
    LinkSpec::new(Endpoint::new(ZONE, "zone_id"), "HAS_CELL", Endpoint::new(ZONE_CELL, "h3_cell"))
}

fn of_type() -> LinkSpec {
    LinkSpec::new(Endpoint::new(ZONE, "zone_id"), "OF_TYPE", Endpoint::new(ZONE_TYPE, "id"))
}

/// Writes zones, cells and backbone partitions through a `GraphStore`.
///
/// Node records are collapsed by key before writing, then sent in batches;
/// every batch is an independent merge, so an interrupted load can simply be
/// run again.
pub struct GraphLoader<S: GraphStore> {
    store: S,
    batch_size: usize,
    schema_ready: bool,
}

impl<S: GraphStore> GraphLoader<S> {
    pub fn new(store: S) -> Self {
        Self { store, batch_size: DEFAULT_BATCH_SIZE, schema_ready: false }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[inline] pub fn store(&self) -> &S { &self.store }

    #[inline] pub fn store_mut(&mut self) -> &mut S { &mut self.store }

    pub fn into_store(self) -> S { self.store }

    /// Declare the unique keys. Runs once per loader.
    pub fn ensure_schema(&mut self) -> Result<(), StoreError> {
        if !self.schema_ready {
            for (label, key) in SCHEMA {
                self.store.ensure_unique_constraint(label, key)?;
            }
            self.schema_ready = true;
        }
        Ok(())
    }

    /// Upsert collapsed records of one label in batches.
    pub fn upsert_all(&mut self, label: &str, key: &str, records: &[Properties], report: &mut LoadReport) -> Result<(), StoreError> {
        for (i, batch) in batches(records, self.batch_size).enumerate() {
            let outcome = self.store.upsert_batch(label, key, batch)?;
            debug!(%label, batch = i, size = batch.len(), created = outcome.created, "upserted");
            report.record_nodes(label, outcome);
        }
        Ok(())
    }

    /// Merge explicit edges in batches.
    pub fn link_all(&mut self, spec: &LinkSpec, pairs: &[LinkPair], report: &mut LoadReport) -> Result<(), StoreError> {
        for batch in batches(pairs, self.batch_size) {
            let outcome = self.store.link_pairs(spec, batch)?;
            report.record_link(&spec.rel, outcome);
        }
        Ok(())
    }

    fn link_matched(&mut self, spec: &LinkSpec, report: &mut LoadReport) -> Result<(), StoreError> {
        let outcome = self.store.link_by_matched_keys(spec)?;
        if outcome.edges() == 0 {
            info!(rel = %spec.rel, target = %spec.to.label, ?outcome, "nothing linked");
        }
        report.record_link(&spec.rel, outcome);
        Ok(())
    }

    /// Load the coarse backbone cells, optionally their partitions, and link
    /// cells to partitions.
    ///
    /// Counts land in `report` batch by batch, so a failed load still shows
    /// what was written.
    pub fn load_backbone(&mut self, table: &BackboneTable, with_partitions: bool, report: &mut LoadReport) -> Result<(), StoreError> {
        self.ensure_schema()?;
        let before = report.created(ZONE_CELL);

        let mut cells = NodeCollapser::new(ZONE_CELL, "h3_cell");
        cells.extend(table.rows().map(|(cell, entry)| backbone_cell_node(cell, entry)))?;
        self.upsert_all(ZONE_CELL, "h3_cell", &cells.into_records(), report)?;

        if with_partitions {
            let mut partitions = NodeCollapser::new(MOKU, "moku_id");
            partitions.extend(table.partitions().iter().map(partition_node))?;
            self.upsert_all(MOKU, "moku_id", &partitions.into_records(), report)?;
        }

        self.link_matched(&within(), report)?;
        info!(cells = table.len(), created = report.created(ZONE_CELL) - before, "backbone loaded");
        Ok(())
    }

    /// Load one source's zones and cell assignments.
    ///
    /// Zones named only by assignments still get a node. Cells are linked to
    /// their zone, to their coarse parent cell and to their partition.
    pub fn load_source(
        &mut self,
        assignments: &[ZoneCellAssignment],
        zones: &[ZoneRecord],
        meta: SourceMeta<'_>,
        report: &mut LoadReport,
    ) -> Result<(), StoreError> {
        self.ensure_schema()?;
        let before = report.created(ZONE_CELL);

        self.upsert_all(ZONE_TYPE, "id", &[zone_type_node(meta)], report)?;

        let mut zone_nodes = NodeCollapser::new(ZONE, "zone_id");
        let mut described = AHashSet::new();
        for record in zones {
            if described.insert(record.zone_id.clone()) {
                zone_nodes.push(zone_node(record, meta))?;
            }
        }
        for row in assignments {
            if described.insert(row.zone_id.clone()) {
                let bare = ZoneRecord { zone_id: row.zone_id.clone(), name: None, island: None, attributes: Default::default() };
                zone_nodes.push(zone_node(&bare, meta))?;
            }
        }
        let zone_nodes = zone_nodes.into_records();
        self.upsert_all(ZONE, "zone_id", &zone_nodes, report)?;

        let mut cells = NodeCollapser::new(ZONE_CELL, "h3_cell");
        cells.extend(assignments.iter().map(cell_node))?;
        self.upsert_all(ZONE_CELL, "h3_cell", &cells.into_records(), report)?;

        let mut seen = AHashSet::new();
        let memberships: Vec<LinkPair> = assignments.iter()
            .filter(|row| seen.insert((row.zone_id.clone(), row.h3_cell)))
            .map(|row| LinkPair::new(row.zone_id.as_str(), row.h3_cell.to_string()))
            .collect();
        self.link_all(&has_cell(), &memberships, report)?;

        let typed: Vec<LinkPair> = zone_nodes.iter()
            .filter_map(|z| z.get("zone_id").cloned())
            .map(|id| LinkPair::new(id, meta.zone_type))
            .collect();
        self.link_all(&of_type(), &typed, report)?;

        self.link_matched(&child_of(), report)?;
        self.link_matched(&within(), report)?;

        info!(
            zone_type = %meta.zone_type,
            zones = zone_nodes.len(),
            rows = assignments.len(),
            cells_created = report.created(ZONE_CELL) - before,
            "source loaded"
        );
        Ok(())
    }

    /// Re-run the key-matched links; picks up targets loaded since the last run.
    pub fn link(&mut self, report: &mut LoadReport) -> Result<(), StoreError> {
        self.link_matched(&child_of(), report)?;
        self.link_matched(&within(), report)
    }
}
