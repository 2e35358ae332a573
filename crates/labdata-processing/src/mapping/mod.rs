//! Column reconciliation against the surveillance target vocabulary.
//!
//! - [`TargetVocabulary`]: ordered standard fields plus user-defined ones
//! - [`ColumnReconciler`]: similarity-based suggestions and `apply`
//! - [`MappingHistory`]: caller-owned cache of previously confirmed mappings

mod history;
mod reconciler;
mod vocabulary;

pub use history::MappingHistory;
pub use reconciler::{ColumnReconciler, normalize_name};
pub use vocabulary::{STANDARD_FIELDS, TargetVocabulary};

use crate::types::Dataset;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A partial function from target field to source column name.
///
/// Several targets may point at the same source; see [`Mapping::collisions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapping {
    entries: BTreeMap<String, String>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `target` to `source`, returning the previous source if any.
    pub fn assign(&mut self, target: impl Into<String>, source: impl Into<String>) -> Option<String> {
        self.entries.insert(target.into(), source.into())
    }

    /// Remove the entry for `target`.
    pub fn unassign(&mut self, target: &str) -> Option<String> {
        self.entries.remove(target)
    }

    pub fn get(&self, target: &str) -> Option<&str> {
        self.entries.get(target).map(String::as_str)
    }

    pub fn contains_target(&self, target: &str) -> bool {
        self.entries.contains_key(target)
    }

    /// Whether any target draws from `source`.
    pub fn uses_source(&self, source: &str) -> bool {
        self.entries.values().any(|s| s == source)
    }

    /// `(target, source)` pairs, sorted by target name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, s)| (t.as_str(), s.as_str()))
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sources claimed by more than one target, with those targets.
    pub fn collisions(&self) -> BTreeMap<String, Vec<String>> {
        let mut by_source: HashMap<&str, Vec<String>> = HashMap::new();
        for (target, source) in &self.entries {
            by_source
                .entry(source.as_str())
                .or_default()
                .push(target.clone());
        }

        by_source
            .into_iter()
            .filter(|(_, targets)| targets.len() > 1)
            .map(|(source, targets)| (source.to_string(), targets))
            .collect()
    }

    /// Drop entries whose source column is not in `dataset`, returning them.
    pub fn prune_missing(&mut self, dataset: &Dataset) -> Vec<(String, String)> {
        let stale: Vec<(String, String)> = self
            .entries
            .iter()
            .filter(|(_, source)| !dataset.has_column(source))
            .map(|(t, s)| (t.clone(), s.clone()))
            .collect();

        for (target, _) in &stale {
            self.entries.remove(target);
        }
        stale
    }
}

impl<T, S> FromIterator<(T, S)> for Mapping
where
    T: Into<String>,
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (T, S)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(t, s)| (t.into(), s.into()))
                .collect(),
        }
    }
}
