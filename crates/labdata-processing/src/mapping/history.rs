use super::Mapping;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Minimum Jaccard similarity of column sets for reusing a stored mapping.
const SIMILAR_SCHEMA_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone)]
struct StoredMapping {
    columns: BTreeSet<String>,
    mapping: Mapping,
}

#[derive(Debug, Default)]
struct HistoryState {
    /// Keyed by schema signature (sorted source names joined with `|`).
    by_signature: BTreeMap<String, StoredMapping>,
    /// Last target each source column was mapped to.
    by_column: HashMap<String, String>,
}

/// Caller-owned cache of confirmed mappings.
///
/// Shared across threads behind an `Arc`; every access goes through one
/// `RwLock`. Nothing is persisted beyond the process.
#[derive(Debug, Default)]
pub struct MappingHistory {
    state: RwLock<HistoryState>,
}

impl MappingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn signature(columns: &BTreeSet<String>) -> String {
        columns.iter().map(String::as_str).collect::<Vec<_>>().join("|")
    }

    /// Remember `mapping` as confirmed for a dataset with `source_columns`.
    pub fn record(&self, source_columns: &[String], mapping: &Mapping) {
        let columns: BTreeSet<String> = source_columns.iter().cloned().collect();
        let signature = Self::signature(&columns);

        let mut state = self.state.write();
        for (target, source) in mapping.iter() {
            if columns.contains(source) {
                state.by_column.insert(source.to_string(), target.to_string());
            }
        }
        state.by_signature.insert(
            signature,
            StoredMapping {
                columns,
                mapping: mapping.clone(),
            },
        );
        debug!("Recorded mapping with {} entries", mapping.len());
    }

    /// Best stored mapping for a dataset with `source_columns`.
    ///
    /// Tries the exact column set, then the most similar stored column set
    /// (Jaccard above 0.5), then the per-column table. Entries whose source
    /// is not among `source_columns` are removed from the result.
    pub fn lookup(&self, source_columns: &[String]) -> Option<Mapping> {
        let columns: BTreeSet<String> = source_columns.iter().cloned().collect();
        let state = self.state.read();

        if let Some(stored) = state.by_signature.get(&Self::signature(&columns)) {
            debug!("Mapping history: exact schema match");
            return Self::restricted(&stored.mapping, &columns);
        }

        let mut best: Option<(&StoredMapping, f64)> = None;
        for stored in state.by_signature.values() {
            let score = jaccard(&stored.columns, &columns);
            if score > SIMILAR_SCHEMA_THRESHOLD && best.is_none_or(|(_, b)| score > b) {
                best = Some((stored, score));
            }
        }
        if let Some((stored, score)) = best
            && let Some(mapping) = Self::restricted(&stored.mapping, &columns)
        {
            debug!("Mapping history: similar schema match ({:.2})", score);
            return Some(mapping);
        }

        let mut mapping = Mapping::new();
        for source in source_columns {
            if let Some(target) = state.by_column.get(source)
                && !mapping.contains_target(target)
            {
                mapping.assign(target.clone(), source.clone());
            }
        }
        if mapping.is_empty() {
            None
        } else {
            debug!("Mapping history: {} per-column matches", mapping.len());
            Some(mapping)
        }
    }

    fn restricted(mapping: &Mapping, columns: &BTreeSet<String>) -> Option<Mapping> {
        let kept: Mapping = mapping
            .iter()
            .filter(|(_, source)| columns.contains(*source))
            .collect();
        if kept.is_empty() { None } else { Some(kept) }
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.by_signature.clear();
        state.by_column.clear();
    }

    /// Number of stored schema signatures.
    pub fn len(&self) -> usize {
        self.state.read().by_signature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_lookup() {
        let history = MappingHistory::new();
        let columns = names(&["org", "nation"]);
        let mapping: Mapping = [("Organism", "org"), ("Country", "nation")]
            .into_iter()
            .collect();
        history.record(&columns, &mapping);

        assert_eq!(history.len(), 1);
        assert_eq!(history.lookup(&names(&["nation", "org"])), Some(mapping));
    }

    #[test]
    fn test_similar_schema_lookup_drops_missing_sources() {
        let history = MappingHistory::new();
        let mapping: Mapping = [("Organism", "org"), ("Country", "nation"), ("Gender", "sex")]
            .into_iter()
            .collect();
        history.record(&names(&["org", "nation", "sex"]), &mapping);

        // 2 shared of 3 total columns
        let found = history.lookup(&names(&["org", "nation"])).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found.get("Gender"), None);
    }

    #[test]
    fn test_per_column_fallback() {
        let history = MappingHistory::new();
        let mapping: Mapping = [("Organism", "org")].into_iter().collect();
        history.record(&names(&["org", "a", "b", "c"]), &mapping);

        let found = history.lookup(&names(&["org", "x", "y", "z"])).unwrap();
        assert_eq!(found.get("Organism"), Some("org"));
        assert_eq!(history.lookup(&names(&["unrelated"])), None);
    }

    #[test]
    fn test_clear() {
        let history = MappingHistory::new();
        history.record(&names(&["org"]), &[("Organism", "org")].into_iter().collect());
        assert!(!history.is_empty());
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.lookup(&names(&["org"])), None);
    }

    #[test]
    fn test_shared_between_threads() {
        let history = Arc::new(MappingHistory::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let history = Arc::clone(&history);
                std::thread::spawn(move || {
                    let column = format!("col{}", i);
                    let mapping: Mapping = [("Organism", column.as_str())].into_iter().collect();
                    history.record(&[column.clone()], &mapping);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(history.len(), 4);
    }
}
