//! Matcher - pick the best candidate per provider for one archive.
//!
//! Every configured provider is queried concurrently. A provider with an
//! explicit identifier in the hint is asked to `fetch` that record directly
//! (confidence 1.0); all others are searched and their results scored:
//!
//! ```text
//! score = 0.5 * series_similarity + 0.3 * issue_exact + 0.2 * year_closeness
//! ```
//!
//! Components the hint has no value for score zero, so a right-series,
//! wrong-issue result without a year stays at 0.5. The top-scoring result
//! is kept when it reaches the acceptance threshold. Provider failures
//! never abort the others; they only mean "no candidate from this provider".

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::model::{normalize_issue_number, CanonicalIssue, ProviderCandidate};
use crate::providers::{with_retry, MetadataProvider, ProviderError, RetryPolicy, SearchHint};

const SERIES_WEIGHT: f32 = 0.5;
const ISSUE_WEIGHT: f32 = 0.3;
const YEAR_WEIGHT: f32 = 0.2;

/// Everything known about an archive before any provider is asked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchHint {
    pub search: SearchHint,
    /// Provider name → provider-native id to fetch directly
    pub explicit_ids: BTreeMap<String, String>,
}

/// Matcher tuning, taken from the configuration once at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSettings {
    /// Minimum score for a search result to be accepted (0.0 to 1.0)
    pub acceptance_threshold: f32,
    /// Upper bound for one provider's whole answer, retries included
    pub provider_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.6,
            provider_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&Config> for MatchSettings {
    fn from(config: &Config) -> Self {
        Self {
            acceptance_threshold: config.matching.acceptance_threshold,
            provider_timeout: Duration::from_secs(config.matching.provider_timeout_secs),
            retry: RetryPolicy {
                max_retries: config.retry.max_retries,
                backoff_base: Duration::from_millis(config.retry.backoff_base_ms),
            },
        }
    }
}

/// Result of one matching pass.
#[derive(Debug, Default)]
pub struct MatchOutcome {
    /// At most one accepted candidate per provider, in provider order
    pub accepted: Vec<ProviderCandidate>,
    /// Providers that failed, with the error that ended their attempt
    pub failures: Vec<(String, ProviderError)>,
}

impl MatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Queries providers and selects candidates.
pub struct Matcher {
    providers: Vec<Arc<dyn MetadataProvider>>,
    settings: MatchSettings,
}

impl Matcher {
    pub fn new(providers: Vec<Arc<dyn MetadataProvider>>, settings: MatchSettings) -> Self {
        Self {
            providers,
            settings,
        }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Query every provider concurrently and keep the best candidate of each.
    pub async fn find_matches(&self, hint: &MatchHint) -> MatchOutcome {
        let answers = join_all(
            self.providers
                .iter()
                .map(|provider| self.match_provider(provider.as_ref(), hint)),
        )
        .await;

        let mut outcome = MatchOutcome::default();
        for (provider, answer) in self.providers.iter().zip(answers) {
            match answer {
                Ok(Some(candidate)) => {
                    info!(
                        provider = %provider.name(),
                        confidence = candidate.confidence,
                        "Accepted candidate"
                    );
                    outcome.accepted.push(candidate);
                }
                Ok(None) => {
                    debug!(provider = %provider.name(), "No candidate above threshold");
                }
                Err(e) => {
                    warn!(provider = %provider.name(), error = %e, "Provider failed");
                    outcome.failures.push((provider.name().to_string(), e));
                }
            }
        }
        outcome
    }

    async fn match_provider(
        &self,
        provider: &dyn MetadataProvider,
        hint: &MatchHint,
    ) -> Result<Option<ProviderCandidate>, ProviderError> {
        let timeout = self.settings.provider_timeout;
        match tokio::time::timeout(timeout, self.query_provider(provider, hint)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Unavailable(format!(
                "no answer within {}s",
                timeout.as_secs_f32()
            ))),
        }
    }

    async fn query_provider(
        &self,
        provider: &dyn MetadataProvider,
        hint: &MatchHint,
    ) -> Result<Option<ProviderCandidate>, ProviderError> {
        let name = provider.name();
        let retry = &self.settings.retry;

        if let Some(id) = hint.explicit_ids.get(name) {
            debug!(provider = %name, id = %id, "Fetching by explicit id");
            let issue = with_retry(retry, name, || provider.fetch(id)).await?;
            return Ok(Some(ProviderCandidate::new(name, issue)));
        }

        if hint.search.is_empty() {
            return Ok(None);
        }

        let candidates = with_retry(retry, name, || provider.search(&hint.search)).await?;
        debug!(provider = %name, count = candidates.len(), "Search returned candidates");

        let Some(best) = select_best(
            &hint.search,
            candidates,
            self.settings.acceptance_threshold,
        ) else {
            return Ok(None);
        };

        Ok(Some(self.complete(provider, best).await))
    }

    /// Search results are often summaries; fetch the full record when the
    /// candidate carries this provider's id. Failure keeps the summary.
    async fn complete(
        &self,
        provider: &dyn MetadataProvider,
        candidate: ProviderCandidate,
    ) -> ProviderCandidate {
        let name = provider.name();
        let Some(id) = candidate.issue.identifiers.get(name).cloned() else {
            return candidate;
        };
        match with_retry(&self.settings.retry, name, || provider.fetch(&id)).await {
            Ok(issue) => ProviderCandidate { issue, ..candidate },
            Err(e) => {
                warn!(provider = %name, id = %id, error = %e, "Detail fetch failed, keeping search result");
                candidate
            }
        }
    }
}

/// Score every candidate against the hint and return the best one at or
/// above `threshold`, with its confidence set to the score.
///
/// Ties prefer an exact issue-number match, then the earlier candidate.
pub fn select_best(
    hint: &SearchHint,
    candidates: Vec<ProviderCandidate>,
    threshold: f32,
) -> Option<ProviderCandidate> {
    let mut best: Option<(f32, bool, ProviderCandidate)> = None;
    for candidate in candidates {
        let candidate_score = score(hint, &candidate.issue);
        let exact = issue_matches(hint, &candidate.issue);
        let better = match &best {
            None => true,
            Some((best_score, best_exact, _)) => match compare_scores(candidate_score, *best_score) {
                Ordering::Greater => true,
                Ordering::Equal => exact && !best_exact,
                Ordering::Less => false,
            },
        };
        if better {
            best = Some((candidate_score, exact, candidate));
        }
    }

    let (score, _, candidate) = best?;
    if score < threshold {
        debug!(score, threshold, "Best candidate below threshold");
        return None;
    }
    Some(candidate.with_confidence(score))
}

/// Scores closer than this are a tie.
const SCORE_EPSILON: f32 = 1e-5;

fn compare_scores(a: f32, b: f32) -> Ordering {
    if (a - b).abs() <= SCORE_EPSILON {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

/// Weighted similarity between a hint and a candidate record (0.0 to 1.0).
///
/// A component the hint has no value for contributes nothing, so a bare
/// series match can never clear the default threshold on its own. The
/// series volume fills the year slot when the hint has no year.
pub fn score(hint: &SearchHint, issue: &CanonicalIssue) -> f32 {
    let mut total = 0.0;

    if let Some(series) = hint.series.as_deref().filter(|s| !s.trim().is_empty()) {
        total += SERIES_WEIGHT * series_similarity(series, issue.series_title.as_deref());
    }

    if issue_matches(hint, issue) {
        total += ISSUE_WEIGHT;
    }

    if let Some(year) = hint.year {
        total += YEAR_WEIGHT * year_closeness(year, issue.year());
    } else if let Some(volume) = hint.volume
        && issue.series_volume == Some(volume)
    {
        total += YEAR_WEIGHT;
    }

    total
}

fn issue_matches(hint: &SearchHint, issue: &CanonicalIssue) -> bool {
    match (hint.issue_number.as_deref(), issue.issue_number.normalized()) {
        (Some(wanted), Some(number)) => normalize_issue_number(wanted) == number,
        _ => false,
    }
}

/// Normalized Levenshtein similarity of normalized series titles.
fn series_similarity(wanted: &str, candidate: Option<&str>) -> f32 {
    let Some(candidate) = candidate else {
        return 0.0;
    };
    strsim::normalized_levenshtein(&normalize_title(wanted), &normalize_title(candidate)) as f32
}

/// Lowercase, punctuation to spaces, collapse whitespace, drop leading "the".
pub fn normalize_title(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.strip_prefix("the ") {
        Some(rest) => rest.to_string(),
        None => collapsed,
    }
}

fn year_closeness(wanted: i32, candidate: Option<i32>) -> f32 {
    match candidate.map(|year| (year - wanted).abs()) {
        Some(0) => 1.0,
        Some(1) => 0.5,
        _ => 0.0,
    }
}
