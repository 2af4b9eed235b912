//! Provider-facing domain types shared by all adapters.
//!
//! These types are OUR types - adapters convert provider DTOs into
//! [`crate::model::CanonicalIssue`] and report failures as [`ProviderError`].

use chrono::NaiveDate;

/// Search terms derived from a filename or previously embedded tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHint {
    /// Series name as it appears in the filename
    pub series: Option<String>,
    /// Raw issue number ("1", "001", "1.5")
    pub issue_number: Option<String>,
    /// Cover/release year
    pub year: Option<i32>,
    /// Series volume
    pub volume: Option<u32>,
}

impl SearchHint {
    pub fn is_empty(&self) -> bool {
        self.series.is_none()
            && self.issue_number.is_none()
            && self.year.is_none()
            && self.volume.is_none()
    }

    /// Free-text query for providers that only offer keyword search.
    pub fn query_text(&self) -> Option<String> {
        let series = self.series.as_deref()?.trim();
        if series.is_empty() {
            return None;
        }
        Some(match self.issue_number.as_deref().map(str::trim) {
            Some(number) if !number.is_empty() => format!("{series} {number}"),
            _ => series.to_string(),
        })
    }
}

/// Errors a provider call can produce.
///
/// Only [`ProviderError::Unavailable`] is transient; everything else is
/// permanent for the request that produced it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Response does not match the expected schema: {0}")]
    SchemaMismatch(String),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Trim a provider string; blank becomes `None`.
pub(crate) fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim a list of provider strings, dropping blanks.
pub(crate) fn clean_list(values: impl IntoIterator<Item = String>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|v| clean_text(Some(v)))
        .collect()
}

/// Parse `YYYY-MM-DD` (or `YYYY-MM`, which maps to the first of the month).
pub(crate) fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    let value = value?.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").ok())
}

/// Capitalize the first letter of each word ("cover artist" → "Cover Artist").
pub(crate) fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
