//! Shared HTTP plumbing for provider clients.
//!
//! Maps transport failures and HTTP status codes onto [`ProviderError`] so
//! every client classifies them the same way:
//! - connection errors, 429 and 5xx → `Unavailable` (retried)
//! - 404 → `NotFound`
//! - other 4xx → `Rejected`
//! - body that doesn't decode → `SchemaMismatch`

use serde::de::DeserializeOwned;

use super::domain::ProviderError;

/// User agent sent to every provider
pub(crate) const USER_AGENT: &str = concat!(
    "ComicMinder/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/comic-minder)"
);

/// Build the shared reqwest client.
pub(crate) fn build_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .gzip(true)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ProviderError::Rejected(format!("Failed to build HTTP client: {e}")))
}

/// Send a request and return the body of a successful response.
pub(crate) async fn send(request: reqwest::RequestBuilder) -> Result<Vec<u8>, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = format!(
            "HTTP {}: {}",
            status,
            body.chars().take(200).collect::<String>()
        );
        return Err(classify_status(status, detail));
    }

    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| ProviderError::Unavailable(e.to_string()))
}

fn classify_status(status: reqwest::StatusCode, detail: String) -> ProviderError {
    if status == reqwest::StatusCode::NOT_FOUND {
        ProviderError::NotFound(detail)
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ProviderError::Unavailable(detail)
    } else {
        ProviderError::Rejected(detail)
    }
}

/// Decode a JSON body into a DTO.
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProviderError> {
    serde_json::from_slice(body).map_err(|e| ProviderError::SchemaMismatch(e.to_string()))
}
