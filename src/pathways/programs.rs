use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::batch::{Deduplicator, NodeCollapser};
use crate::common::value_text;
use crate::pathways::tables::{cluster_for_title, program_suffix, slugify, stage, Cluster};
use crate::store::{LinkPair, Properties, StoreError};

const SOURCE: &str = "programs.json";

/// One row of a program's entry list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ProgramEntry {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_level")]
    pub level: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub level_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub level_info: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub level_data: Option<String>,
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(value_text(&Value::deserialize(deserializer)?))
}

fn lenient_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

impl ProgramEntry {
    fn is(&self, level: i64, level_type: &str) -> bool {
        self.level == Some(level) && self.level_type.as_deref() == Some(level_type)
    }

    fn info_contains(&self, needle: &str) -> bool {
        self.level_info.as_deref().is_some_and(|info| info.contains(needle))
    }
}

/// Program key to its entries, keys in sorted order.
pub type Programs = Vec<(String, Vec<ProgramEntry>)>;

pub fn read_programs(path: &Path) -> Result<Programs> {
    let file = File::open(path)
        .with_context(|| format!("[pathways] Failed to open {}", path.display()))?;
    let raw: Map<String, Value> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("[pathways] Failed to parse {}", path.display()))?;
    let mut programs = raw.into_iter()
        .map(|(key, entries)| {
            let entries = serde_json::from_value(entries)
                .with_context(|| format!("[pathways] Entries of {key:?} are not a list of objects"))?;
            Ok((key, entries))
        })
        .collect::<Result<Programs>>()?;
    programs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(programs)
}

/// Nodes and edges derived from the programs file, ready to load.
#[derive(Debug, Clone, Default)]
pub struct PathwayGraph {
    pub pathways: Vec<Properties>,
    pub programs: Vec<Properties>,
    pub occupations: Vec<Properties>,
    pub trainings: Vec<Properties>,
    pub credentials: Vec<Properties>,
    /// `CareerPathway.id -> ProgramOfStudy.id`
    pub includes: Vec<LinkPair>,
    /// `ProgramOfStudy.id -> Occupation.soc_code`, qualified by stage.
    pub prepares: Vec<LinkPair>,
    /// `ProgramOfStudy.id -> TrainingProgram.id`, qualified by stage.
    pub has_training: Vec<LinkPair>,
    /// `ProgramOfStudy.id -> Credential.id`, qualified by stage.
    pub recommends: Vec<LinkPair>,
    /// Cluster ids present, in first-seen order.
    pub clusters: Vec<&'static str>,
    /// Program keys left out, with the reason.
    pub unresolved: Vec<(String, &'static str)>,
}

fn resolve_cluster(entries: &[ProgramEntry]) -> Option<Cluster> {
    entries.iter().filter_map(|e| e.title.as_deref()).find_map(cluster_for_title)
}

fn training_category(entry: &ProgramEntry) -> &'static str {
    if entry.info_contains("SHORT-TERM TRAINING OPTIONS: CREDITED") {
        "short_term_credited"
    } else if entry.info_contains("SHORT-TERM TRAINING OPTIONS: NON-CREDIT")
        || entry.info_contains("SHORT-TERM TRAINING: NON-CREDIT")
    {
        "short_term_noncredit"
    } else if entry.info_contains("RECOMMENDED EDUCATION") {
        "recommended_education"
    } else {
        "other"
    }
}

fn level_data<'a>(entries: &'a [ProgramEntry], pred: impl Fn(&ProgramEntry) -> bool) -> Option<&'a str> {
    entries.iter().find(|e| pred(*e)).and_then(|e| e.level_data.as_deref())
}

/// Build the pathway graph.
///
/// Programs whose cluster or id suffix cannot be resolved are left out and
/// listed in `unresolved`. Training programs and credentials shared by
/// several programs keep the attributes of their first occurrence.
pub fn build_pathways(programs: &Programs) -> Result<PathwayGraph, StoreError> {
    let mut graph = PathwayGraph::default();
    let mut pathways = NodeCollapser::new("CareerPathway", "id");
    let mut studies = NodeCollapser::new("ProgramOfStudy", "id");
    let mut occupations = NodeCollapser::new("Occupation", "soc_code");
    let mut trainings = Deduplicator::new();
    let mut credentials = Deduplicator::new();

    for (key, entries) in programs {
        let Some(cluster) = resolve_cluster(entries) else {
            warn!(program = %key, "no cluster resolved, skipping");
            graph.unresolved.push((key.clone(), "no cluster"));
            continue;
        };
        let Some(suffix) = program_suffix(key) else {
            warn!(program = %key, "no id suffix mapping, skipping");
            graph.unresolved.push((key.clone(), "no suffix"));
            continue;
        };
        let program_id = format!("{}_{suffix}", cluster.id);

        if !graph.clusters.contains(&cluster.id) {
            graph.clusters.push(cluster.id);
        }
        pathways.push(node(json!({
            "id": cluster.id,
            "name": cluster.name,
            "topic_number": cluster.topic,
            "source": "HawaiiCareerPathways",
        })))?;

        let custom = |info: &'static str| move |e: &ProgramEntry| e.is(0, "CUSTOM") && e.level_info.as_deref() == Some(info);
        let name = level_data(entries, custom("PATHWAY_TITLE")).unwrap_or(key.as_str());
        let early_college = entries.iter().find(|e| e.is(0, "EARLYCOLLEGE")).and_then(|e| e.level_info.as_deref());
        studies.push(node(json!({
            "id": program_id,
            "name": name,
            "description": level_data(entries, custom("PATHWAY_DESCRIPTION")),
            "cluster_id": cluster.id,
            "early_college_url": early_college,
            "start_info": level_data(entries, |e| e.is(0, "START_INFORMATION")),
            "source": SOURCE,
        })))?;
        graph.includes.push(LinkPair::new(cluster.id, program_id.as_str()));

        for entry in entries {
            let level_type = entry.level_type.as_deref();
            let Some(data) = entry.level_data.as_deref() else { continue };

            if level_type == Some("JOB_TITLE") && entry.level_info.as_deref() == Some("RELATED OCCUPATIONS") {
                let Some(stage) = entry.level.and_then(stage) else { continue };
                for soc in data.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                    occupations.push(node(json!({"soc_code": soc, "source": SOURCE})))?;
                    graph.prepares.push(LinkPair::new(program_id.as_str(), soc).with_qualifier("stage", stage));
                }
            } else if level_type == Some("TRAINING") {
                if data == "Not Available" {
                    continue;
                }
                let stage = entry.level.and_then(stage).unwrap_or("other");
                let id = slugify(data);
                if entry.info_contains("CERTIFICATIONS") {
                    if credentials.admit(id.clone()) {
                        graph.credentials.push(node(json!({
                            "id": id, "name": data, "type": "Certification", "source": SOURCE,
                        })));
                    }
                    graph.recommends.push(LinkPair::new(program_id.as_str(), id).with_qualifier("stage", stage));
                } else {
                    if trainings.admit(id.clone()) {
                        graph.trainings.push(node(json!({
                            "id": id, "name": data, "track_level": stage,
                            "category": training_category(entry), "source": SOURCE,
                        })));
                    }
                    graph.has_training.push(LinkPair::new(program_id.as_str(), id).with_qualifier("stage", stage));
                }
            } else if level_type == Some("OPTIONS") && entry.level_info.as_deref() == Some("OTHER OPTIONS") {
                let stage = entry.level.and_then(stage).unwrap_or("other");
                let id = slugify(data);
                if trainings.admit(id.clone()) {
                    graph.trainings.push(node(json!({
                        "id": id, "name": data, "track_level": stage,
                        "category": "other_option", "source": SOURCE,
                    })));
                }
                graph.has_training.push(LinkPair::new(program_id.as_str(), id).with_qualifier("stage", stage));
            }
        }
    }

    graph.pathways = pathways.into_records();
    graph.programs = studies.into_records();
    graph.occupations = occupations.into_records();
    Ok(graph)
}

/// Object literal to properties, dropping null members.
fn node(value: Value) -> Properties {
    match value {
        Value::Object(map) => map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
        _ => Properties::new(),
    }
}
