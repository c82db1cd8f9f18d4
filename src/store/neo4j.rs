use std::collections::{BTreeSet, HashMap};

use neo4rs::{query, BoltNull, BoltType, Graph, Query};
use serde_json::Value;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use crate::batch::DEFAULT_BATCH_SIZE;
use crate::store::{
    validate_identifier, GraphStore, LinkOutcome, LinkPair, LinkSpec, Properties, StoreError, UpsertOutcome,
};

/// Bolt connection settings.
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl Neo4jConfig {
    /// Read `NEO4J_URI`, `NEO4J_USER` and `NEO4J_PASSWORD`.
    pub fn from_env() -> Result<Self, StoreError> {
        let var = |name: &str| std::env::var(name)
            .map_err(|_| StoreError::Unavailable(format!("{name} is not set")));
        Ok(Self { uri: var("NEO4J_URI")?, user: var("NEO4J_USER")?, password: var("NEO4J_PASSWORD")? })
    }
}

/// `GraphStore` over a Neo4j database.
///
/// The store owns a tokio runtime and blocks on each call, so the loader stays
/// synchronous. Every write batch runs in its own transaction which is either
/// committed or rolled back before the call returns. Key-matched links are
/// written in pages of distinct source key values, one transaction per page.
pub struct Neo4jStore {
    runtime: Runtime,
    graph: Graph,
    link_page: usize,
}

impl Neo4jStore {
    pub fn connect(config: &Neo4jConfig) -> Result<Self, StoreError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to start runtime: {e}")))?;
        let graph = runtime
            .block_on(Graph::new(&config.uri, &config.user, &config.password))
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", config.uri)))?;
        Ok(Self { runtime, graph, link_page: DEFAULT_BATCH_SIZE })
    }

    /// Distinct source key values per key-matched link transaction.
    pub fn with_link_page(mut self, keys: usize) -> Self {
        self.link_page = keys.max(1);
        self
    }

    /// Run write queries in a single transaction.
    fn write(&self, label: &str, queries: Vec<Query>) -> Result<(), StoreError> {
        let graph = &self.graph;
        self.runtime.block_on(async {
            let mut txn = graph.start_txn().await.map_err(|e| StoreError::Unavailable(e.to_string()))?;
            let mut failure = None;
            for q in queries {
                if let Err(e) = txn.run(q).await {
                    failure = Some(e);
                    break;
                }
            }
            match failure {
                None => txn.commit().await.map_err(|e| write_error(label, e)),
                Some(e) => {
                    if let Err(rollback) = txn.rollback().await {
                        warn!(%label, error = %rollback, "rollback failed");
                    }
                    Err(write_error(label, e))
                }
            }
        })
    }

    /// Run a read query returning a single integer column.
    fn count(&self, q: Query, column: &str) -> Result<usize, StoreError> {
        let graph = &self.graph;
        self.runtime.block_on(async {
            let mut stream = graph.execute(q).await.map_err(|e| StoreError::Unavailable(e.to_string()))?;
            let row = stream.next().await.map_err(|e| StoreError::Unavailable(e.to_string()))?;
            let n = row.and_then(|row| row.get::<i64>(column).ok()).unwrap_or(0);
            Ok(usize::try_from(n).unwrap_or(0))
        })
    }

    /// Up to `limit` distinct string values of `label.key` ordered after `after`.
    fn key_page(&self, label: &str, key: &str, after: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let q = query(&format!(
            "MATCH (n:{label}) WHERE n.{key} > $after RETURN DISTINCT n.{key} AS k ORDER BY k LIMIT $limit"
        ))
        .param("after", after)
        .param("limit", i64::try_from(limit).unwrap_or(i64::MAX));
        let graph = &self.graph;
        self.runtime.block_on(async {
            let mut stream = graph.execute(q).await.map_err(|e| StoreError::Unavailable(e.to_string()))?;
            let mut keys = Vec::with_capacity(limit);
            while let Some(row) = stream.next().await.map_err(|e| StoreError::Unavailable(e.to_string()))? {
                if let Ok(k) = row.get::<String>("k") {
                    keys.push(k);
                }
            }
            Ok(keys)
        })
    }
}

/// Matches one page of `$keys` on both ends of a key-matched link.
fn matched_page_pattern(spec: &LinkSpec) -> String {
    format!(
        "UNWIND $keys AS k MATCH (a:{} {{{}: k}}) MATCH (b:{} {{{}: k}})",
        spec.from.label, spec.from.key, spec.to.label, spec.to.key
    )
}

impl GraphStore for Neo4jStore {
    fn ensure_unique_constraint(&mut self, label: &str, property: &str) -> Result<(), StoreError> {
        validate_identifier(label)?;
        validate_identifier(property)?;
        let name = format!("{}_{}_unique", label.to_lowercase(), property.to_lowercase());
        let statement = format!(
            "CREATE CONSTRAINT {name} IF NOT EXISTS FOR (n:{label}) REQUIRE n.{property} IS UNIQUE"
        );
        self.write(label, vec![query(&statement)])
    }

    fn upsert_batch(&mut self, label: &str, key: &str, records: &[Properties]) -> Result<UpsertOutcome, StoreError> {
        validate_identifier(label)?;
        validate_identifier(key)?;
        if records.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let mut keys = BTreeSet::new();
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            match record.get(key) {
                Some(value) if !value.is_null() => { keys.insert(value.to_string()); }
                _ => return Err(StoreError::MissingKey { label: label.to_string(), key: key.to_string() }),
            }
            rows.push(bolt_map(record)?);
        }
        let key_values: Vec<BoltType> = records.iter().filter_map(|r| r.get(key)).map(bolt).collect();

        let existing = self.count(
            query(&format!("MATCH (n:{label}) WHERE n.{key} IN $keys RETURN count(DISTINCT n.{key}) AS existing"))
                .param("keys", key_values),
            "existing",
        )?;

        let statement = format!(
            "UNWIND $rows AS row \
             MERGE (n:{label} {{{key}: row.{key}}}) \
             ON CREATE SET n.created_at = datetime() \
             SET n += row, n.updated_at = datetime()"
        );
        self.write(label, vec![query(&statement).param("rows", rows)])?;

        let created = keys.len().saturating_sub(existing);
        debug!(%label, records = records.len(), created, "upserted batch");
        Ok(UpsertOutcome { created, updated: records.len() - created })
    }

    fn link_by_matched_keys(&mut self, spec: &LinkSpec) -> Result<LinkOutcome, StoreError> {
        spec.validate()?;
        let LinkSpec { from, rel, to, qualifiers } = spec;
        if self.count_nodes(&to.label)? == 0 {
            return Ok(LinkOutcome::NoTargets);
        }

        // Matched keys are strings; pages follow their sort order.
        let pattern = matched_page_pattern(spec);
        let (props, params) = qualifier_pattern(qualifiers, "$q_")?;
        let mut after = String::new();
        let mut matched = 0;
        loop {
            let keys = self.key_page(&from.label, &from.key, &after, self.link_page)?;
            let Some(last) = keys.last().cloned() else { break };

            matched += self.count(
                query(&format!("{pattern} RETURN count(*) AS matched")).param("keys", keys.clone()),
                "matched",
            )?;
            let mut q = query(&format!("{pattern} MERGE (a)-[:{rel}{props}]->(b)")).param("keys", keys);
            for (name, value) in &params {
                q = q.param(name, value.clone());
            }
            self.write(rel, vec![q])?;
            debug!(%rel, after = %last, matched, "linked key page");
            after = last;
        }
        Ok(LinkOutcome::Linked(matched))
    }

    fn link_pairs(&mut self, spec: &LinkSpec, pairs: &[LinkPair]) -> Result<LinkOutcome, StoreError> {
        spec.validate()?;
        let LinkSpec { from, rel, to, qualifiers } = spec;
        if self.count_nodes(&to.label)? == 0 {
            return Ok(LinkOutcome::NoTargets);
        }

        // One statement per qualifier key set, since property names are part of the pattern.
        let mut groups: HashMap<Vec<String>, Vec<HashMap<String, BoltType>>> = HashMap::new();
        for pair in pairs {
            let mut merged = qualifiers.clone();
            merged.extend(pair.qualifiers.iter().map(|(k, v)| (k.clone(), v.clone())));
            let mut names: Vec<String> = merged.keys().cloned().collect();
            names.sort();
            for name in &names {
                validate_identifier(name)?;
            }

            let mut row = HashMap::new();
            row.insert("from".to_string(), bolt(&pair.from));
            row.insert("to".to_string(), bolt(&pair.to));
            row.insert("q".to_string(), BoltType::from(bolt_map(&merged)?));
            groups.entry(names).or_default().push(row);
        }

        let pattern = format!(
            "UNWIND $pairs AS pair MATCH (a:{} {{{}: pair.from}}) MATCH (b:{} {{{}: pair.to}})",
            from.label, from.key, to.label, to.key
        );
        let mut matched = 0;
        let mut statements = Vec::with_capacity(groups.len());
        for (names, rows) in groups {
            matched += self.count(
                query(&format!("{pattern} RETURN count(*) AS matched")).param("pairs", rows.clone()),
                "matched",
            )?;
            let props = if names.is_empty() {
                String::new()
            } else {
                let fields: Vec<String> = names.iter().map(|n| format!("{n}: pair.q.{n}")).collect();
                format!(" {{{}}}", fields.join(", "))
            };
            statements.push(query(&format!("{pattern} MERGE (a)-[:{rel}{props}]->(b)")).param("pairs", rows));
        }
        self.write(rel, statements)?;
        Ok(LinkOutcome::Linked(matched))
    }

    fn count_nodes(&mut self, label: &str) -> Result<usize, StoreError> {
        validate_identifier(label)?;
        self.count(query(&format!("MATCH (n:{label}) RETURN count(n) AS count")), "count")
    }

    fn count_edges(&mut self, rel: &str) -> Result<usize, StoreError> {
        validate_identifier(rel)?;
        self.count(query(&format!("MATCH ()-[r:{rel}]->() RETURN count(r) AS count")), "count")
    }
}

/// Map a driver failure, recognising unique constraint violations.
fn write_error(label: &str, error: neo4rs::Error) -> StoreError {
    let message = error.to_string();
    if message.contains("ConstraintValidationFailed") {
        StoreError::KeyConflict {
            label: label.to_string(),
            key: String::new(),
            value: String::new(),
            detail: message,
        }
    } else {
        StoreError::Write { label: label.to_string(), message }
    }
}

/// ` {stage: $q_stage}` plus its parameters, empty when there are no qualifiers.
fn qualifier_pattern(qualifiers: &Properties, prefix: &str) -> Result<(String, Vec<(String, BoltType)>), StoreError> {
    if qualifiers.is_empty() {
        return Ok((String::new(), Vec::new()));
    }
    let mut fields = Vec::new();
    let mut params = Vec::new();
    for (name, value) in qualifiers {
        validate_identifier(name)?;
        fields.push(format!("{name}: {prefix}{name}"));
        params.push((format!("q_{name}"), bolt(value)));
    }
    Ok((format!(" {{{}}}", fields.join(", ")), params))
}

fn bolt_map(properties: &Properties) -> Result<HashMap<String, BoltType>, StoreError> {
    properties.iter()
        .map(|(k, v)| validate_identifier(k).map(|k| (k.to_string(), bolt(v))))
        .collect()
}

/// Scalars map directly; string lists become lists; anything else is stored
/// as its JSON text.
fn bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or_default().into(),
        },
        Value::String(s) => s.clone().into(),
        Value::Array(items) if items.iter().all(Value::is_string) => items.iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect::<Vec<String>>()
            .into(),
        other => other.to_string().into(),
    }
}
