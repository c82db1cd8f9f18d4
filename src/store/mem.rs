use ahash::{AHashMap, AHashSet};
use chrono::Utc;
use serde_json::Value;

use crate::store::{
    validate_identifier, GraphStore, LinkOutcome, LinkPair, LinkSpec, Properties, StoreError, UpsertOutcome,
};

type NodeRef = (String, usize);

/// Node slots of one label grouped by the JSON text of one property.
type Index = AHashMap<String, Vec<usize>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EdgeKey {
    from: NodeRef,
    rel: String,
    to: NodeRef,
    /// Canonical JSON of the qualifiers, keys sorted.
    qualifiers: String,
}

/// A node as it will look once the pending batch commits.
struct Staged {
    /// Existing slot, `None` for a node the batch creates.
    at: Option<usize>,
    properties: Properties,
}

/// In-process graph with the same merge semantics as the database backend.
///
/// A batch is applied whole or not at all. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemGraph {
    nodes: AHashMap<String, Vec<Properties>>,
    constraints: AHashSet<(String, String)>,
    /// Built on first use per `(label, property)` and kept current by upserts.
    indexes: AHashMap<(String, String), Index>,
    edges: AHashMap<EdgeKey, Properties>,
}

impl MemGraph {
    pub fn new() -> Self { Self::default() }

    /// The node of `label` whose `key` equals `value`.
    pub fn node(&self, label: &str, key: &str, value: &Value) -> Option<&Properties> {
        let nodes = self.nodes.get(label)?;
        match self.index(label, key) {
            Some(index) => nodes.get(*index.get(&value.to_string())?.first()?),
            None => nodes.iter().find(|n| n.get(key) == Some(value)),
        }
    }

    /// `(from node, qualifiers, to node)` for every edge of type `rel`.
    pub fn edges(&self, rel: &str) -> Vec<(&Properties, &Properties, &Properties)> {
        self.edges.iter()
            .filter(|(edge, _)| edge.rel == rel)
            .filter_map(|(edge, qualifiers)| Some((self.resolve(&edge.from)?, qualifiers, self.resolve(&edge.to)?)))
            .collect()
    }

    #[inline] pub fn has_constraint(&self, label: &str, property: &str) -> bool {
        self.constraints.contains(&(label.to_string(), property.to_string()))
    }

    fn resolve(&self, node: &NodeRef) -> Option<&Properties> {
        self.nodes.get(&node.0)?.get(node.1)
    }

    fn ensure_index(&mut self, label: &str, property: &str) {
        let slot = (label.to_string(), property.to_string());
        if self.indexes.contains_key(&slot) {
            return;
        }
        let mut index = Index::new();
        for (at, node) in self.nodes.get(label).into_iter().flatten().enumerate() {
            if let Some(text) = index_text(node.get(property)) {
                index.entry(text).or_default().push(at);
            }
        }
        self.indexes.insert(slot, index);
    }

    fn index(&self, label: &str, property: &str) -> Option<&Index> {
        self.indexes.get(&(label.to_string(), property.to_string()))
    }

    /// Merge `records` into copies of their nodes without touching the graph.
    fn stage(&self, label: &str, key: &str, records: &[Properties]) -> Result<(Vec<Staged>, UpsertOutcome), StoreError> {
        let existing = self.nodes.get(label);
        let keys = self.index(label, key);
        let now = Value::String(Utc::now().to_rfc3339());
        let mut staged: Vec<Staged> = Vec::new();
        let mut by_key: AHashMap<String, usize> = AHashMap::new();
        let mut outcome = UpsertOutcome::default();

        for record in records {
            record.keys().try_for_each(|k| validate_identifier(k).map(|_| ()))?;
            let Some(value) = index_text(record.get(key)) else {
                return Err(StoreError::MissingKey { label: label.to_string(), key: key.to_string() });
            };
            let slot = match by_key.get(&value) {
                Some(&slot) => {
                    outcome.updated += 1;
                    slot
                }
                None => {
                    let found = keys
                        .and_then(|index| index.get(&value)?.first().copied())
                        .and_then(|at| Some((at, existing?.get(at)?)));
                    let node = match found {
                        Some((at, node)) => {
                            outcome.updated += 1;
                            Staged { at: Some(at), properties: node.clone() }
                        }
                        None => {
                            outcome.created += 1;
                            let mut fresh = Properties::new();
                            fresh.insert("created_at".into(), now.clone());
                            Staged { at: None, properties: fresh }
                        }
                    };
                    staged.push(node);
                    by_key.insert(value, staged.len() - 1);
                    staged.len() - 1
                }
            };
            let node = &mut staged[slot].properties;
            for (k, v) in record {
                match v {
                    Value::Null => { node.remove(k); }
                    _ => { node.insert(k.clone(), v.clone()); }
                }
            }
            node.insert("updated_at".into(), now.clone());
        }
        Ok((staged, outcome))
    }

    /// Every constrained property of `label` other than `key` must stay
    /// unique once `staged` is committed.
    fn check_constraints(&self, label: &str, key: &str, staged: &[Staged]) -> Result<(), StoreError> {
        let touched: AHashSet<usize> = staged.iter().filter_map(|node| node.at).collect();
        for (constrained_label, property) in &self.constraints {
            if constrained_label != label || property == key {
                continue;
            }
            let committed = self.index(label, property);
            let mut claimed = AHashSet::new();
            for node in staged {
                let Some(text) = index_text(node.properties.get(property)) else { continue };
                let held_elsewhere = committed
                    .and_then(|index| index.get(&text))
                    .is_some_and(|slots| slots.iter().any(|at| Some(*at) != node.at && !touched.contains(at)));
                if !claimed.insert(text.clone()) || held_elsewhere {
                    return Err(StoreError::KeyConflict {
                        label: label.to_string(),
                        key: property.clone(),
                        value: text,
                        detail: "unique constraint violated by upsert".into(),
                    });
                }
            }
        }
        Ok(())
    }

    fn commit(&mut self, label: &str, staged: Vec<Staged>) {
        let nodes = self.nodes.entry(label.to_string()).or_default();
        for node in staged {
            let (at, before) = match node.at {
                Some(at) => (at, std::mem::replace(&mut nodes[at], node.properties)),
                None => {
                    nodes.push(node.properties);
                    (nodes.len() - 1, Properties::new())
                }
            };
            let after = &nodes[at];
            for ((indexed_label, property), index) in &mut self.indexes {
                if indexed_label == label {
                    reindex(index, at, index_text(before.get(property)), index_text(after.get(property)));
                }
            }
        }
    }

    fn merge_edges(&mut self, spec: &LinkSpec, matches: Vec<(usize, usize, Properties)>) -> LinkOutcome {
        let count = matches.len();
        for (from, to, qualifiers) in matches {
            let key = EdgeKey {
                from: (spec.from.label.clone(), from),
                rel: spec.rel.clone(),
                to: (spec.to.label.clone(), to),
                qualifiers: canonical(&qualifiers),
            };
            self.edges.entry(key).or_insert(qualifiers);
        }
        LinkOutcome::Linked(count)
    }

    fn has_nodes(&self, label: &str) -> bool {
        self.nodes.get(label).is_some_and(|nodes| !nodes.is_empty())
    }

    /// Indexes for both link endpoints, `None` when nothing can be linked.
    fn endpoints(&mut self, spec: &LinkSpec) -> Option<(&Index, &Index)> {
        if !self.has_nodes(&spec.to.label) {
            return None;
        }
        self.ensure_index(&spec.from.label, &spec.from.key);
        self.ensure_index(&spec.to.label, &spec.to.key);
        Some((self.index(&spec.from.label, &spec.from.key)?, self.index(&spec.to.label, &spec.to.key)?))
    }
}

impl GraphStore for MemGraph {
    fn ensure_unique_constraint(&mut self, label: &str, property: &str) -> Result<(), StoreError> {
        validate_identifier(label)?;
        validate_identifier(property)?;
        self.constraints.insert((label.to_string(), property.to_string()));
        self.ensure_index(label, property);
        Ok(())
    }

    fn upsert_batch(&mut self, label: &str, key: &str, records: &[Properties]) -> Result<UpsertOutcome, StoreError> {
        validate_identifier(label)?;
        validate_identifier(key)?;
        self.ensure_index(label, key);
        let constrained: Vec<String> = self.constraints.iter()
            .filter(|(l, _)| l == label)
            .map(|(_, p)| p.clone())
            .collect();
        for property in &constrained {
            self.ensure_index(label, property);
        }

        let (staged, outcome) = self.stage(label, key, records)?;
        self.check_constraints(label, key, &staged)?;
        self.commit(label, staged);
        Ok(outcome)
    }

    fn link_by_matched_keys(&mut self, spec: &LinkSpec) -> Result<LinkOutcome, StoreError> {
        spec.validate()?;
        let Some((sources, targets)) = self.endpoints(spec) else {
            return Ok(LinkOutcome::NoTargets);
        };
        let matches: Vec<(usize, usize, Properties)> = sources.iter()
            .filter_map(|(value, from)| Some((from, targets.get(value)?)))
            .flat_map(|(from, to)| from.iter().flat_map(move |f| to.iter().map(move |t| (*f, *t))))
            .map(|(f, t)| (f, t, spec.qualifiers.clone()))
            .collect();
        Ok(self.merge_edges(spec, matches))
    }

    fn link_pairs(&mut self, spec: &LinkSpec, pairs: &[LinkPair]) -> Result<LinkOutcome, StoreError> {
        spec.validate()?;
        for pair in pairs {
            pair.qualifiers.keys().try_for_each(|k| validate_identifier(k).map(|_| ()))?;
        }
        let Some((sources, targets)) = self.endpoints(spec) else {
            return Ok(LinkOutcome::NoTargets);
        };

        let mut matches = Vec::new();
        for pair in pairs {
            let (Some(from), Some(to)) = (sources.get(&pair.from.to_string()), targets.get(&pair.to.to_string())) else {
                continue;
            };
            let mut qualifiers = spec.qualifiers.clone();
            qualifiers.extend(pair.qualifiers.iter().map(|(k, v)| (k.clone(), v.clone())));
            for &f in from {
                for &t in to {
                    matches.push((f, t, qualifiers.clone()));
                }
            }
        }
        Ok(self.merge_edges(spec, matches))
    }

    fn count_nodes(&mut self, label: &str) -> Result<usize, StoreError> {
        Ok(self.nodes.get(label).map_or(0, Vec::len))
    }

    fn count_edges(&mut self, rel: &str) -> Result<usize, StoreError> {
        Ok(self.edges.keys().filter(|edge| edge.rel == rel).count())
    }
}

fn index_text(value: Option<&Value>) -> Option<String> {
    value.filter(|v| !v.is_null()).map(Value::to_string)
}

fn reindex(index: &mut Index, at: usize, before: Option<String>, after: Option<String>) {
    if before == after {
        return;
    }
    if let Some(old) = before {
        if let Some(slots) = index.get_mut(&old) {
            slots.retain(|&slot| slot != at);
            if slots.is_empty() {
                index.remove(&old);
            }
        }
    }
    if let Some(new) = after {
        index.entry(new).or_default().push(at);
    }
}

fn canonical(properties: &Properties) -> String {
    let mut entries: Vec<(&String, &Value)> = properties.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(";")
}
