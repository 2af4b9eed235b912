//! Comic Vine HTTP client
//!
//! Handles communication with the Comic Vine REST API.
//! See: https://comicvine.gamespot.com/api/documentation
//!
//! IMPORTANT: Comic Vine requires an API key and a descriptive User-Agent;
//! anonymous requests are rejected.

use tracing::debug;

use super::{adapter, dto};
use crate::model::{CanonicalIssue, ProviderCandidate};
use crate::providers::domain::{ProviderError, SearchHint};
use crate::providers::http;

/// Comic Vine resource type prefix for issues
const ISSUE_RESOURCE: &str = "4000";

/// Maximum search results requested per query
const SEARCH_LIMIT: u32 = 20;

/// Comic Vine API client
pub struct ComicVineClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ComicVineClient {
    /// Create a new client
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, "https://comicvine.gamespot.com/api")
    }

    /// Create a client with a custom base URL (mirrors, tests)
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: http::build_client()?,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Search issues matching the hint, in Comic Vine's relevance order
    pub async fn search(&self, hint: &SearchHint) -> Result<Vec<ProviderCandidate>, ProviderError> {
        let Some(query) = hint.query_text() else {
            return Ok(Vec::new());
        };
        debug!(query = %query, "Searching Comic Vine");

        let body = http::send(self.http_client.get(self.search_url(&query))).await?;
        let envelope: dto::Envelope<Vec<dto::Issue>> = decode_envelope(&body, &query)?;
        Ok(adapter::to_candidates(envelope.results))
    }

    /// Fetch a full issue record by Comic Vine id
    pub async fn fetch(&self, id: &str) -> Result<CanonicalIssue, ProviderError> {
        let id = id.trim().trim_start_matches("4000-");
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ProviderError::Rejected(format!(
                "invalid Comic Vine issue id: {id:?}"
            )));
        }
        debug!(id, "Fetching Comic Vine issue");

        let body = http::send(self.http_client.get(self.issue_url(id))).await?;
        let envelope: dto::Envelope<dto::Issue> = decode_envelope(&body, id)?;
        Ok(adapter::to_issue(envelope.results))
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search/?api_key={}&format=json&resources=issue&query={}&limit={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(query),
            SEARCH_LIMIT
        )
    }

    fn issue_url(&self, id: &str) -> String {
        format!(
            "{}/issue/{}-{}/?api_key={}&format=json",
            self.base_url,
            ISSUE_RESOURCE,
            id,
            urlencoding::encode(&self.api_key)
        )
    }
}

/// Check the envelope status first; `results` has a different shape on error.
fn decode_envelope<T: serde::de::DeserializeOwned>(
    body: &[u8],
    request: &str,
) -> Result<dto::Envelope<T>, ProviderError> {
    let status: dto::Status = http::decode(body)?;
    adapter::check_status(&status, request)?;
    http::decode(body)
}
