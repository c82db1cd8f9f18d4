use tracing::info;

use crate::loader::{GraphLoader, LoadReport, ZONE_TYPE};
use crate::pathways::PathwayGraph;
use crate::store::{Endpoint, GraphStore, LinkPair, LinkSpec, StoreError};

const PATHWAY: &str = "CareerPathway";
const PROGRAM: &str = "ProgramOfStudy";
const OCCUPATION: &str = "Occupation";
const TRAINING: &str = "TrainingProgram";
const CREDENTIAL: &str = "Credential";

/// Career clusters tied to the zone types they work in.
const ZONE_TYPE_BRIDGES: [(&str, &str); 1] = [("AFNR", "ag")];

fn from_program(rel: &str, to: Endpoint) -> LinkSpec {
    LinkSpec::new(Endpoint::new(PROGRAM, "id"), rel, to)
}

/// Write the pathway graph and bridge clusters to zone types.
pub fn load_pathways<S: GraphStore>(loader: &mut GraphLoader<S>, graph: &PathwayGraph, report: &mut LoadReport) -> Result<(), StoreError> {
    let store = loader.store_mut();
    for (label, key) in [(PATHWAY, "id"), (PROGRAM, "id"), (TRAINING, "id"), (CREDENTIAL, "id"), (OCCUPATION, "soc_code")] {
        store.ensure_unique_constraint(label, key)?;
    }

    loader.upsert_all(PATHWAY, "id", &graph.pathways, report)?;
    loader.upsert_all(PROGRAM, "id", &graph.programs, report)?;
    loader.upsert_all(OCCUPATION, "soc_code", &graph.occupations, report)?;
    loader.upsert_all(TRAINING, "id", &graph.trainings, report)?;
    loader.upsert_all(CREDENTIAL, "id", &graph.credentials, report)?;

    let includes = LinkSpec::new(Endpoint::new(PATHWAY, "id"), "INCLUDES_PROGRAM", Endpoint::new(PROGRAM, "id"));
    loader.link_all(&includes, &graph.includes, report)?;
    loader.link_all(&from_program("PREPARES_FOR", Endpoint::new(OCCUPATION, "soc_code")), &graph.prepares, report)?;
    loader.link_all(&from_program("HAS_TRAINING", Endpoint::new(TRAINING, "id")), &graph.has_training, report)?;
    loader.link_all(&from_program("RECOMMENDS_CREDENTIAL", Endpoint::new(CREDENTIAL, "id")), &graph.recommends, report)?;

    let bridges: Vec<LinkPair> = ZONE_TYPE_BRIDGES.iter()
        .filter(|(cluster, _)| graph.clusters.contains(cluster))
        .map(|(cluster, zone_type)| LinkPair::new(*cluster, *zone_type))
        .collect();
    if !bridges.is_empty() {
        let spec = LinkSpec::new(Endpoint::new(PATHWAY, "id"), "ALIGNS_WITH_ZONE_TYPE", Endpoint::new(ZONE_TYPE, "id"));
        loader.link_all(&spec, &bridges, report)?;
    }

    info!(
        pathways = graph.pathways.len(),
        programs = graph.programs.len(),
        occupations = graph.occupations.len(),
        unresolved = graph.unresolved.len(),
        "pathways loaded"
    );
    Ok(())
}
