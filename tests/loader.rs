use zonegraph::backbone::{BackboneEntry, BackboneTable};
use zonegraph::hexcover::{CellIndex, Position, Resolution, cell_at};
use zonegraph::loader::{GraphLoader, LoadReport, SourceMeta, ZONE, ZONE_CELL};
use zonegraph::store::{GraphStore, MemGraph};
use zonegraph::zone::{ZoneCellAssignment, ZoneId};

const META: SourceMeta<'static> = SourceMeta { zone_type: "rail", data_source: "test", version: "v1" };

/// 100 distinct res-9 cells along a line, ten per zone.
fn assignments() -> Vec<ZoneCellAssignment> {
    let mut seen = Vec::new();
    let mut step = 0;
    while seen.len() < 100 {
        let position = Position::new(-158.0 + step as f64 * 0.004, 21.4);
        step += 1;
        let Some(cell) = cell_at(position, Resolution::Nine) else { continue };
        if !seen.contains(&cell) {
            seen.push(cell);
        }
    }
    seen.into_iter()
        .enumerate()
        .map(|(i, cell): (usize, CellIndex)| ZoneCellAssignment {
            zone_id: ZoneId::from_raw(format!("RAIL_{}", i / 10)),
            h3_cell: cell,
            parent_h3: cell.parent(Resolution::Seven),
            moku_id: None,
            island: Some("oahu".into()),
            version: "v1".into(),
            data_source: "test".into(),
            provenance: "Line sample res9 from rail".into(),
        })
        .collect()
}

#[test]
fn loading_the_same_batch_twice_keeps_one_node_per_key() {
    let rows = assignments();
    let mut loader = GraphLoader::new(MemGraph::new()).with_batch_size(7);

    let mut first = LoadReport::default();
    loader.load_source(&rows, &[], META, &mut first).unwrap();
    let mut second = LoadReport::default();
    loader.load_source(&rows, &[], META, &mut second).unwrap();

    assert_eq!(first.created(ZONE_CELL), 100);
    assert_eq!(second.created(ZONE_CELL), 0);
    assert_eq!(second.nodes[ZONE_CELL].updated, 100);

    let store = loader.store_mut();
    assert_eq!(store.count_nodes(ZONE_CELL).unwrap(), 100);
    assert_eq!(store.count_nodes(ZONE).unwrap(), 10);
    assert_eq!(store.count_edges("HAS_CELL").unwrap(), 100);
    assert_eq!(store.count_edges("OF_TYPE").unwrap(), 10);
}

#[test]
fn backbone_loaded_later_is_linked_by_link_step() {
    let rows = assignments();
    let mut table = BackboneTable::new(Resolution::Seven);
    for parent in rows.iter().filter_map(|r| r.parent_h3) {
        let entry = BackboneEntry { moku_id: "kona".into(), moku_name: Some("Kona".into()), island: Some("oahu".into()) };
        table.insert(parent, entry).unwrap();
    }

    let mut loader = GraphLoader::new(MemGraph::new());
    loader.load_source(&rows, &[], META, &mut LoadReport::default()).unwrap();
    assert_eq!(loader.store_mut().count_edges("CHILD_OF").unwrap(), 0);

    loader.load_backbone(&table, true, &mut LoadReport::default()).unwrap();
    let mut report = LoadReport::default();
    loader.link(&mut report).unwrap();

    assert_eq!(report.edges["CHILD_OF"], 100);
    let store = loader.store_mut();
    assert_eq!(store.count_nodes("Moku").unwrap(), 1);
    assert_eq!(store.count_edges("WITHIN").unwrap(), table.len());
    assert_eq!(store.count_nodes(ZONE_CELL).unwrap(), 100 + table.len());
}
