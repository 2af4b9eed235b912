//! Reconciler - merge per-provider candidates into one record.
//!
//! Scalar fields take the value of the first provider in that field's
//! precedence order that supplies one. List fields are unioned in
//! precedence order and de-duplicated case and whitespace insensitively,
//! keeping the first-seen spelling. Every populated field records which
//! provider(s) it came from.
//!
//! Merging is deterministic: the same candidates and policy always give
//! the same record and provenance; only `merged_at` changes.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    CanonicalIssue, Credit, Field, FieldProvenance, IssueNumber, MergedMetadata, Provenance,
    ProviderCandidate,
};

/// How the default provider order is chosen for one archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecedenceMode {
    /// Configured global order
    #[default]
    Fixed,
    /// Highest candidate confidence first; ties fall back to the global order
    Confidence,
}

/// Which providers are trusted first, globally and per field.
///
/// Providers not named in a list rank after the listed ones, alphabetically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecedencePolicy {
    #[serde(rename = "order")]
    pub global: Vec<String>,
    pub mode: PrecedenceMode,
    #[serde(rename = "fields")]
    pub per_field: BTreeMap<Field, Vec<String>>,
}

impl Default for PrecedencePolicy {
    fn default() -> Self {
        Self {
            global: vec!["metron".to_string(), "comicvine".to_string()],
            mode: PrecedenceMode::Fixed,
            per_field: BTreeMap::new(),
        }
    }
}

impl PrecedencePolicy {
    pub fn new<S: Into<String>>(global: impl IntoIterator<Item = S>) -> Self {
        Self {
            global: global.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_field<S: Into<String>>(
        mut self,
        field: Field,
        order: impl IntoIterator<Item = S>,
    ) -> Self {
        self.per_field
            .insert(field, order.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_mode(mut self, mode: PrecedenceMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Reconciliation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("No provider produced a mergeable candidate")]
    NoMatch,
}

/// Merges accepted candidates under a precedence policy.
#[derive(Debug, Clone)]
pub struct Reconciler {
    policy: PrecedencePolicy,
}

impl Reconciler {
    pub fn new(policy: PrecedencePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PrecedencePolicy {
        &self.policy
    }

    /// Merge candidates, stamping the result with the current time.
    pub fn merge(&self, candidates: &[ProviderCandidate]) -> Result<MergedMetadata, ReconcileError> {
        self.merge_at(candidates, Utc::now())
    }

    /// Merge candidates with an explicit timestamp.
    pub fn merge_at(
        &self,
        candidates: &[ProviderCandidate],
        merged_at: DateTime<Utc>,
    ) -> Result<MergedMetadata, ReconcileError> {
        let mut seen = HashSet::new();
        let usable: Vec<&ProviderCandidate> = candidates
            .iter()
            .filter(|c| c.issue.is_mergeable())
            .filter(|c| seen.insert(c.provider.clone()))
            .collect();
        if usable.is_empty() {
            return Err(ReconcileError::NoMatch);
        }

        let base = self.base_order(&usable);
        let mut merge = Merge {
            policy: &self.policy,
            base: &base,
            issue: CanonicalIssue::default(),
            provenance: FieldProvenance::new(),
        };

        merge.issue.series_title = merge.scalar(Field::SeriesTitle, |i| i.series_title.clone());
        merge.issue.series_volume = merge.scalar(Field::SeriesVolume, |i| i.series_volume);
        merge.issue.issue_number = merge
            .scalar(Field::IssueNumber, |i| i.issue_number.as_str().map(String::from))
            .map_or(IssueNumber::Unknown, IssueNumber::Known);
        merge.issue.issue_title = merge.scalar(Field::IssueTitle, |i| i.issue_title.clone());
        merge.issue.release_date = merge.scalar(Field::ReleaseDate, |i| i.release_date);
        merge.issue.summary = merge.scalar(Field::Summary, |i| i.summary.clone());
        merge.issue.publisher = merge.scalar(Field::Publisher, |i| i.publisher.clone());
        merge.issue.format = merge.scalar(Field::Format, |i| i.format);
        merge.issue.rating = merge.scalar(Field::Rating, |i| i.rating.clone());
        merge.issue.cover_url = merge.scalar(Field::CoverUrl, |i| i.cover_url.clone());
        merge.issue.web_url = merge.scalar(Field::WebUrl, |i| i.web_url.clone());

        merge.issue.credits = merge.union(Field::Credits, |i| &i.credits, credit_key);
        merge.issue.genres = merge.union(Field::Genres, |i| &i.genres, |s| normalize_key(s));
        merge.issue.characters =
            merge.union(Field::Characters, |i| &i.characters, |s| normalize_key(s));
        merge.issue.teams = merge.union(Field::Teams, |i| &i.teams, |s| normalize_key(s));
        merge.issue.locations =
            merge.union(Field::Locations, |i| &i.locations, |s| normalize_key(s));
        merge.issue.story_arcs =
            merge.union(Field::StoryArcs, |i| &i.story_arcs, |s| normalize_key(s));
        merge.issue.identifiers = merge.identifiers();

        Ok(MergedMetadata {
            issue: merge.issue,
            provenance: merge.provenance,
            merged_at,
        })
    }

    /// Default order for this archive's candidates.
    fn base_order<'a>(&self, usable: &[&'a ProviderCandidate]) -> Vec<&'a ProviderCandidate> {
        let mut ordered = arrange(&self.policy.global, usable);
        if self.policy.mode == PrecedenceMode::Confidence {
            // Stable sort keeps the global order among equal confidences
            ordered.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        }
        ordered
    }
}

/// Listed providers in list order, then the rest alphabetically.
fn arrange<'a>(order: &[String], candidates: &[&'a ProviderCandidate]) -> Vec<&'a ProviderCandidate> {
    let mut ranked: Vec<&'a ProviderCandidate> = candidates.to_vec();
    ranked.sort_by(|a, b| {
        let rank = |c: &ProviderCandidate| order.iter().position(|p| *p == c.provider);
        match (rank(*a), rank(*b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.provider.cmp(&b.provider),
        }
    });
    ranked
}

/// Per-merge working state.
struct Merge<'a> {
    policy: &'a PrecedencePolicy,
    base: &'a [&'a ProviderCandidate],
    issue: CanonicalIssue,
    provenance: FieldProvenance,
}

impl<'a> Merge<'a> {
    fn order(&self, field: Field) -> Vec<&'a ProviderCandidate> {
        match self.policy.per_field.get(&field) {
            Some(order) => arrange(order, self.base),
            None => self.base.to_vec(),
        }
    }

    fn scalar<T>(&mut self, field: Field, get: impl Fn(&CanonicalIssue) -> Option<T>) -> Option<T> {
        let (provider, value) = self
            .order(field)
            .into_iter()
            .find_map(|c| get(&c.issue).map(|v| (c.provider.clone(), v)))?;
        self.provenance.insert(field, Provenance::Single(provider));
        Some(value)
    }

    fn union<T: Clone, K: Eq + std::hash::Hash>(
        &mut self,
        field: Field,
        get: impl Fn(&CanonicalIssue) -> &Vec<T>,
        key: impl Fn(&T) -> K,
    ) -> Vec<T> {
        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        let mut contributors = Vec::new();
        for candidate in self.order(field) {
            let values = get(&candidate.issue);
            if values.is_empty() {
                continue;
            }
            contributors.push(candidate.provider.clone());
            for value in values {
                if seen.insert(key(value)) {
                    merged.push(value.clone());
                }
            }
        }
        if !contributors.is_empty() {
            self.provenance.insert(field, Provenance::Union(contributors));
        }
        merged
    }

    /// Identifiers union by provider key; the first id per key wins.
    fn identifiers(&mut self) -> BTreeMap<String, String> {
        let mut merged = BTreeMap::new();
        let mut contributors = Vec::new();
        for candidate in self.order(Field::Identifiers) {
            if candidate.issue.identifiers.is_empty() {
                continue;
            }
            contributors.push(candidate.provider.clone());
            for (provider, id) in &candidate.issue.identifiers {
                merged.entry(provider.clone()).or_insert_with(|| id.clone());
            }
        }
        if !contributors.is_empty() {
            self.provenance
                .insert(Field::Identifiers, Provenance::Union(contributors));
        }
        merged
    }
}

/// Case and whitespace insensitive comparison key.
pub fn normalize_key(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn credit_key(credit: &Credit) -> (String, String) {
    (normalize_key(&credit.role), normalize_key(&credit.name))
}
