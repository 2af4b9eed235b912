//! Metron HTTP client
//!
//! Handles communication with the Metron REST API.
//! See: https://metron.cloud/api/
//!
//! IMPORTANT: Metron requires HTTP basic auth with a registered account.

use tracing::debug;

use super::{adapter, dto};
use crate::model::{CanonicalIssue, ProviderCandidate};
use crate::providers::domain::{ProviderError, SearchHint};
use crate::providers::http;

/// Metron API client
pub struct MetronClient {
    http_client: reqwest::Client,
    username: String,
    password: String,
    base_url: String,
}

impl MetronClient {
    /// Create a new client
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Self::with_base_url(username, password, "https://metron.cloud/api")
    }

    /// Create a client with a custom base URL (mirrors, tests)
    pub fn with_base_url(
        username: impl Into<String>,
        password: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: http::build_client()?,
            username: username.into(),
            password: password.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Search issues by series name, number and cover year
    pub async fn search(&self, hint: &SearchHint) -> Result<Vec<ProviderCandidate>, ProviderError> {
        let Some(url) = self.search_url(hint) else {
            return Ok(Vec::new());
        };
        debug!(url = %url, "Searching Metron");

        let body = http::send(self.get(&url)).await?;
        let page: dto::Page<dto::IssueListItem> = http::decode(&body)?;
        Ok(adapter::to_candidates(page.results, hint))
    }

    /// Fetch a full issue record by Metron id
    pub async fn fetch(&self, id: &str) -> Result<CanonicalIssue, ProviderError> {
        let id = id.trim();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ProviderError::Rejected(format!(
                "invalid Metron issue id: {id:?}"
            )));
        }
        debug!(id, "Fetching Metron issue");

        let body = http::send(self.get(&format!("{}/issue/{}/", self.base_url, id))).await?;
        let issue: dto::Issue = http::decode(&body)?;
        Ok(adapter::to_issue(issue))
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http_client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
    }

    fn search_url(&self, hint: &SearchHint) -> Option<String> {
        let series = hint.series.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let mut url = format!(
            "{}/issue/?series_name={}",
            self.base_url,
            urlencoding::encode(series)
        );
        if let Some(number) = hint.issue_number.as_deref().map(str::trim)
            && !number.is_empty()
        {
            url.push_str(&format!("&number={}", urlencoding::encode(number)));
        }
        if let Some(year) = hint.year {
            url.push_str(&format!("&cover_year={year}"));
        }
        Some(url)
    }
}
