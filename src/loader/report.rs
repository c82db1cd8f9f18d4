use std::{collections::BTreeMap, fmt};

use crate::store::{LinkOutcome, UpsertOutcome};

/// Totals written during one loader session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub nodes: BTreeMap<String, UpsertOutcome>,
    pub edges: BTreeMap<String, usize>,
    /// Edge types skipped because their targets are not loaded yet.
    pub pending: Vec<String>,
}

impl LoadReport {
    pub(crate) fn record_nodes(&mut self, label: &str, outcome: UpsertOutcome) {
        *self.nodes.entry(label.to_string()).or_default() += outcome;
    }

    pub(crate) fn record_link(&mut self, rel: &str, outcome: LinkOutcome) {
        match outcome {
            LinkOutcome::Linked(n) => *self.edges.entry(rel.to_string()).or_default() += n,
            LinkOutcome::NoTargets => {
                if !self.pending.iter().any(|p| p == rel) {
                    self.pending.push(rel.to_string());
                }
            }
        }
    }

    pub fn created(&self, label: &str) -> usize {
        self.nodes.get(label).map_or(0, |o| o.created)
    }

    pub fn merge(&mut self, other: LoadReport) {
        for (label, outcome) in other.nodes {
            self.record_nodes(&label, outcome);
        }
        for (rel, n) in other.edges {
            *self.edges.entry(rel).or_default() += n;
        }
        for rel in other.pending {
            self.record_link(&rel, LinkOutcome::NoTargets);
        }
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, outcome) in &self.nodes {
            writeln!(f, "  {label:<18} {:>8} created {:>8} updated", outcome.created, outcome.updated)?;
        }
        for (rel, n) in &self.edges {
            writeln!(f, "  {rel:<18} {n:>8} edges")?;
        }
        for rel in &self.pending {
            writeln!(f, "  {rel:<18} pending (no targets loaded)")?;
        }
        Ok(())
    }
}
