use super::{Mapping, TargetVocabulary};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::types::{Dataset, next_free_name};
use polars::prelude::*;
use rapidfuzz::distance::indel;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Lowercase a column name and strip everything that is not alphanumeric.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Scores source column names against the target vocabulary and reshapes
/// datasets according to a confirmed [`Mapping`].
#[derive(Debug, Clone)]
pub struct ColumnReconciler {
    threshold: f64,
}

impl Default for ColumnReconciler {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl ColumnReconciler {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            threshold: config.similarity_threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Indel similarity of two names after normalization, in [0, 1].
    ///
    /// This is `1 - (insertions + deletions) / (len(a) + len(b))`. A name
    /// that normalizes to nothing matches nothing.
    pub fn similarity(a: &str, b: &str) -> f64 {
        let a = normalize_name(a);
        let b = normalize_name(b);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        indel::normalized_similarity(a.chars(), b.chars())
    }

    /// Best source per target, scoring every pair independently.
    ///
    /// The same source may be suggested for several targets. Ties keep the
    /// source seen first.
    pub fn suggest(&self, source_columns: &[String], vocabulary: &TargetVocabulary) -> Mapping {
        self.suggest_inner(source_columns, vocabulary, false)
    }

    /// Like [`suggest`](Self::suggest), but a source assigned to an earlier
    /// target (in vocabulary order) is unavailable for later ones.
    pub fn suggest_exclusive(
        &self,
        source_columns: &[String],
        vocabulary: &TargetVocabulary,
    ) -> Mapping {
        self.suggest_inner(source_columns, vocabulary, true)
    }

    fn suggest_inner(
        &self,
        source_columns: &[String],
        vocabulary: &TargetVocabulary,
        exclusive: bool,
    ) -> Mapping {
        let mut mapping = Mapping::new();
        let mut used: HashSet<&str> = HashSet::new();

        for target in vocabulary.fields() {
            let mut best: Option<(&str, f64)> = None;

            for source in source_columns {
                if exclusive && used.contains(source.as_str()) {
                    continue;
                }
                let score = Self::similarity(target, source);
                let beats_best = best.is_none_or(|(_, best_score)| score > best_score);
                if score > self.threshold && beats_best {
                    best = Some((source.as_str(), score));
                }
            }

            if let Some((source, score)) = best {
                debug!("Suggested '{}' -> '{}' (score {:.3})", source, target, score);
                mapping.assign(target, source);
                if exclusive {
                    used.insert(source);
                }
            }
        }

        info!(
            "Suggested {} of {} target fields from {} source columns",
            mapping.len(),
            vocabulary.len(),
            source_columns.len()
        );
        mapping
    }

    /// All sources scored against one target, best first.
    ///
    /// Used to present alternatives when a suggestion is overridden.
    pub fn rank_candidates(&self, target: &str, source_columns: &[String]) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = source_columns
            .iter()
            .map(|source| (source.clone(), Self::similarity(target, source)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// Reshape `dataset` according to `mapping`.
    ///
    /// Output order is standard targets, then custom targets, then every
    /// source column no emitted target consumed, in original order. Entries
    /// whose source is missing, or whose target is outside the vocabulary,
    /// are skipped. Row count and row ids are preserved.
    pub fn apply(
        &self,
        dataset: &Dataset,
        mapping: &Mapping,
        vocabulary: &TargetVocabulary,
    ) -> Result<Dataset> {
        if mapping.is_empty() {
            return Ok(dataset.clone());
        }

        for (target, source) in mapping.iter() {
            if !vocabulary.contains(target) {
                warn!(
                    "Skipping mapping '{}' -> '{}': target is not in the vocabulary",
                    source, target
                );
            }
        }

        let mut output: Vec<Column> = Vec::with_capacity(dataset.width() + mapping.len());
        let mut taken: HashSet<String> = HashSet::new();
        let mut consumed: HashSet<&str> = HashSet::new();

        for target in vocabulary.fields() {
            let Some(source) = mapping.get(target) else {
                continue;
            };
            if !dataset.has_column(source) {
                warn!(
                    "Skipping mapping '{}' -> '{}': source column no longer exists",
                    source, target
                );
                continue;
            }

            let mut column = dataset.column(source)?.clone();
            column.rename(target.into());
            output.push(column);
            taken.insert(target.to_string());
            consumed.insert(source);
        }

        let targets = taken.clone();
        let kept: Vec<&Column> = dataset
            .columns()
            .filter(|column| !consumed.contains(column.name().as_str()))
            .collect();
        taken.extend(kept.iter().map(|column| column.name().to_string()));

        for column in kept {
            let name = column.name().as_str();
            let mut column = column.clone();
            if targets.contains(name) {
                let base = format!("{}_source", name);
                let renamed = if taken.contains(&base) {
                    next_free_name(&base, &taken)
                } else {
                    base
                };
                warn!(
                    "Unmapped column '{}' collides with a target name; kept as '{}'",
                    name, renamed
                );
                column.rename(renamed.as_str().into());
                taken.insert(renamed);
            }
            output.push(column);
        }

        info!(
            "Applied mapping: {} columns in, {} columns out",
            dataset.width(),
            output.len()
        );

        let frame = DataFrame::new(output)?;
        Dataset::from_parts(frame, dataset.row_ids().to_vec())
    }
}
