use std::hash::Hash;

use ahash::{AHashMap, AHashSet};
use serde_json::Value;

use crate::store::{Properties, StoreError};

/// Drops repeated keys, keeping the first occurrence.
#[derive(Debug)]
pub struct Deduplicator<K> {
    seen: AHashSet<K>,
    dropped: usize,
}

impl<K> Default for Deduplicator<K> {
    fn default() -> Self { Self { seen: AHashSet::default(), dropped: 0 } }
}

impl<K: Hash + Eq> Deduplicator<K> {
    pub fn new() -> Self { Self::default() }

    /// `true` the first time `key` is seen.
    pub fn admit(&mut self, key: K) -> bool {
        let fresh = self.seen.insert(key);
        if !fresh { self.dropped += 1 }
        fresh
    }

    /// Keep the items whose key has not been seen, in arrival order.
    pub fn retain<T>(&mut self, items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
        items.into_iter().filter(|item| self.admit(key(item))).collect()
    }

    #[inline] pub fn dropped(&self) -> usize { self.dropped }

    #[inline] pub fn len(&self) -> usize { self.seen.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.seen.is_empty() }
}

/// Collapses node records that share a natural key before they reach the store.
///
/// Identical records merge silently. Two records with the same key but
/// different attributes mean two distinct things were given one identity,
/// which is reported as a key conflict instead of letting the last write win.
#[derive(Debug)]
pub struct NodeCollapser {
    label: String,
    key: String,
    index: AHashMap<String, usize>,
    records: Vec<Properties>,
}

impl NodeCollapser {
    pub fn new(label: &str, key: &str) -> Self {
        Self { label: label.to_string(), key: key.to_string(), index: AHashMap::new(), records: Vec::new() }
    }

    pub fn push(&mut self, record: Properties) -> Result<(), StoreError> {
        let value = match record.get(&self.key) {
            Some(value) if !value.is_null() => key_text(value),
            _ => return Err(StoreError::MissingKey { label: self.label.clone(), key: self.key.clone() }),
        };
        match self.index.get(&value) {
            Some(&at) if self.records[at] == record => Ok(()),
            Some(&at) => Err(StoreError::KeyConflict {
                label: self.label.clone(),
                key: self.key.clone(),
                value,
                detail: describe_difference(&self.records[at], &record),
            }),
            None => {
                self.index.insert(value, self.records.len());
                self.records.push(record);
                Ok(())
            }
        }
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = Properties>) -> Result<(), StoreError> {
        records.into_iter().try_for_each(|record| self.push(record))
    }

    #[inline] pub fn len(&self) -> usize { self.records.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub fn into_records(self) -> Vec<Properties> { self.records }
}

/// Canonical text of a key value; strings are used bare.
pub(crate) fn key_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn describe_difference(first: &Properties, second: &Properties) -> String {
    let mut fields: Vec<&str> = first.keys().chain(second.keys())
        .filter(|k| first.get(*k) != second.get(*k))
        .map(String::as_str)
        .collect();
    fields.sort_unstable();
    fields.dedup();
    format!("records disagree on {}", fields.join(", "))
}
