use serde_json::{Map, Value};

use crate::store::{validate_identifier, StoreError};

/// Node or edge attributes. A `null` value removes the attribute on upsert.
pub type Properties = Map<String, Value>;

/// A node label plus the property used to find nodes of that label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub label: String,
    pub key: String,
}

impl Endpoint {
    pub fn new(label: &str, key: &str) -> Self {
        Self { label: label.to_string(), key: key.to_string() }
    }

    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        validate_identifier(&self.label)?;
        validate_identifier(&self.key)?;
        Ok(())
    }
}

/// An edge type between two endpoints.
///
/// Edges are merged on (from node, `rel`, to node, qualifiers), so the same
/// pair may carry several edges that differ only in a qualifier such as a
/// stage.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSpec {
    pub from: Endpoint,
    pub rel: String,
    pub to: Endpoint,
    /// Qualifiers carried by every edge this spec creates.
    pub qualifiers: Properties,
}

impl LinkSpec {
    pub fn new(from: Endpoint, rel: &str, to: Endpoint) -> Self {
        Self { from, rel: rel.to_string(), to, qualifiers: Properties::new() }
    }

    pub fn with_qualifier(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.qualifiers.insert(key.to_string(), value.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        self.from.validate()?;
        self.to.validate()?;
        validate_identifier(&self.rel)?;
        self.qualifiers.keys().try_for_each(|k| validate_identifier(k).map(|_| ()))
    }
}

/// One explicit edge: `from.key = from`, `to.key = to`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkPair {
    pub from: Value,
    pub to: Value,
    /// Added to the spec's qualifiers for this edge only.
    pub qualifiers: Properties,
}

impl LinkPair {
    pub fn new(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self { from: from.into(), to: to.into(), qualifiers: Properties::new() }
    }

    pub fn with_qualifier(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.qualifiers.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub created: usize,
    pub updated: usize,
}

impl UpsertOutcome {
    #[inline] pub fn total(&self) -> usize { self.created + self.updated }
}

impl std::ops::AddAssign for UpsertOutcome {
    fn add_assign(&mut self, rhs: Self) {
        self.created += rhs.created;
        self.updated += rhs.updated;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Edges matched, whether they already existed or were created.
    Linked(usize),
    /// No node of the target label exists yet. Nothing was written; a later
    /// run links once the targets are loaded.
    NoTargets,
}

impl LinkOutcome {
    pub fn edges(&self) -> usize {
        match self {
            LinkOutcome::Linked(n) => *n,
            LinkOutcome::NoTargets => 0,
        }
    }
}

/// Idempotent writes against a property graph.
///
/// Every write is a merge by natural key, so replaying any sequence of calls
/// converges on the same graph.
pub trait GraphStore {
    /// Declare `property` unique for `label`. Calling it again is a no-op.
    fn ensure_unique_constraint(&mut self, label: &str, property: &str) -> Result<(), StoreError>;

    /// Create or update one node per record, matched on `key`.
    ///
    /// Attributes present in a record overwrite the stored ones,
    /// `created_at` is set only when the node is created, and `updated_at` is
    /// refreshed on every call.
    fn upsert_batch(&mut self, label: &str, key: &str, records: &[Properties]) -> Result<UpsertOutcome, StoreError>;

    /// Merge an edge from every `from` node to every `to` node whose
    /// `to.key` value equals the `from` node's `from.key` value.
    fn link_by_matched_keys(&mut self, spec: &LinkSpec) -> Result<LinkOutcome, StoreError>;

    /// Merge the listed edges. Pairs whose endpoints are missing are skipped.
    fn link_pairs(&mut self, spec: &LinkSpec, pairs: &[LinkPair]) -> Result<LinkOutcome, StoreError>;

    fn count_nodes(&mut self, label: &str) -> Result<usize, StoreError>;

    fn count_edges(&mut self, rel: &str) -> Result<usize, StoreError>;
}

impl<T: GraphStore + ?Sized> GraphStore for Box<T> {
    fn ensure_unique_constraint(&mut self, label: &str, property: &str) -> Result<(), StoreError> {
        (**self).ensure_unique_constraint(label, property)
    }

    fn upsert_batch(&mut self, label: &str, key: &str, records: &[Properties]) -> Result<UpsertOutcome, StoreError> {
        (**self).upsert_batch(label, key, records)
    }

    fn link_by_matched_keys(&mut self, spec: &LinkSpec) -> Result<LinkOutcome, StoreError> {
        (**self).link_by_matched_keys(spec)
    }

    fn link_pairs(&mut self, spec: &LinkSpec, pairs: &[LinkPair]) -> Result<LinkOutcome, StoreError> {
        (**self).link_pairs(spec, pairs)
    }

    fn count_nodes(&mut self, label: &str) -> Result<usize, StoreError> { (**self).count_nodes(label) }

    fn count_edges(&mut self, rel: &str) -> Result<usize, StoreError> { (**self).count_edges(rel) }
}
