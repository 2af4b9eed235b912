//! Metadata providers - look up comic issues in external databases.
//!
//! # Architecture
//!
//! This module follows a clean separation between:
//! - **Domain types** (`domain.rs`) - search hints and provider errors
//! - **API DTOs** (`comicvine/dto.rs`, `metron/dto.rs`) - Exact API response shapes
//! - **Adapters** - Convert DTOs to [`crate::model::CanonicalIssue`]
//! - **Clients** - HTTP clients for external APIs
//! - **Traits** - The [`MetadataProvider`] capability set, plus mocks
//! - **Retry** - Exponential backoff for transient failures
//!
//! Provider schema changes stop at the adapter; everything downstream only
//! sees canonical records.
//!
//! # Usage
//!
//! ```ignore
//! use providers::{ComicVineClient, MetadataProvider, SearchHint};
//!
//! let client = ComicVineClient::new("your-api-key")?;
//! let hint = SearchHint {
//!     series: Some("Example Comic".to_string()),
//!     issue_number: Some("1".to_string()),
//!     ..Default::default()
//! };
//! for candidate in client.search(&hint).await? {
//!     println!("{:?} #{}", candidate.issue.series_title, candidate.issue.issue_number);
//! }
//! ```

pub mod domain;
pub mod comicvine;
pub mod metron;
pub mod traits;
pub mod retry;
mod http;

use std::sync::Arc;

use tracing::warn;

pub use comicvine::ComicVineClient;
pub use domain::{ProviderError, SearchHint};
pub use metron::MetronClient;
pub use retry::{RetryPolicy, with_retry};
pub use traits::MetadataProvider;

use crate::config::Credentials;

/// Build every provider that has credentials configured.
///
/// Providers without credentials are skipped with a warning; a client that
/// fails to build is an error.
pub fn build_providers(
    credentials: &Credentials,
) -> Result<Vec<Arc<dyn MetadataProvider>>, ProviderError> {
    let mut providers: Vec<Arc<dyn MetadataProvider>> = Vec::new();

    if let (Some(username), Some(password)) = (
        credentials.metron_username.as_deref(),
        credentials.metron_password.as_deref(),
    ) {
        providers.push(Arc::new(MetronClient::new(username, password)?));
    } else {
        warn!("Metron credentials not configured, skipping provider");
    }

    if let Some(api_key) = credentials.comicvine_api_key.as_deref() {
        providers.push(Arc::new(ComicVineClient::new(api_key)?));
    } else {
        warn!("Comic Vine API key not configured, skipping provider");
    }

    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_providers_skips_missing_credentials() {
        let credentials = Credentials {
            comicvine_api_key: Some("key".to_string()),
            metron_username: Some("user".to_string()),
            metron_password: None,
        };
        let providers = build_providers(&credentials).unwrap();
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["comicvine"]);
    }

    #[test]
    fn test_build_providers_all_configured() {
        let credentials = Credentials {
            comicvine_api_key: Some("key".to_string()),
            metron_username: Some("user".to_string()),
            metron_password: Some("pass".to_string()),
        };
        let names: Vec<String> = build_providers(&credentials)
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["metron", "comicvine"]);
    }
}
