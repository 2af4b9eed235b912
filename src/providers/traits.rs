//! Trait definitions for metadata providers.
//!
//! These traits enable dependency injection and mocking for tests.
//! Production code uses the real client implementations, while tests
//! can substitute mock implementations.
//!
//! # Example
//!
//! ```ignore
//! use comic_minder::providers::traits::MetadataProvider;
//!
//! async fn first_hit(provider: &dyn MetadataProvider, hint: &SearchHint) {
//!     let candidates = provider.search(hint).await?;
//! }
//! ```

use async_trait::async_trait;

use super::domain::{ProviderError, SearchHint};
use crate::model::{CanonicalIssue, ProviderCandidate};

/// Capability set every metadata provider exposes.
///
/// Implementations translate provider-native records into canonical ones
/// and never cache or persist anything.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Stable provider name used in precedence lists and provenance.
    fn name(&self) -> &str;

    /// Search for issues matching the hint, in provider relevance order.
    async fn search(&self, hint: &SearchHint) -> Result<Vec<ProviderCandidate>, ProviderError>;

    /// Fetch one issue by its provider-native identifier.
    async fn fetch(&self, id: &str) -> Result<CanonicalIssue, ProviderError>;
}

// Implement traits for real clients

#[async_trait]
impl MetadataProvider for super::comicvine::ComicVineClient {
    fn name(&self) -> &str {
        super::comicvine::PROVIDER_NAME
    }

    async fn search(&self, hint: &SearchHint) -> Result<Vec<ProviderCandidate>, ProviderError> {
        self.search(hint).await
    }

    async fn fetch(&self, id: &str) -> Result<CanonicalIssue, ProviderError> {
        self.fetch(id).await
    }
}

#[async_trait]
impl MetadataProvider for super::metron::MetronClient {
    fn name(&self) -> &str {
        super::metron::PROVIDER_NAME
    }

    async fn search(&self, hint: &SearchHint) -> Result<Vec<ProviderCandidate>, ProviderError> {
        self.search(hint).await
    }

    async fn fetch(&self, id: &str) -> Result<CanonicalIssue, ProviderError> {
        self.fetch(id).await
    }
}

/// Mock providers for testing.
///
/// Returns configurable responses for testing different scenarios.
#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Mock provider that returns predefined results.
    pub struct MockProvider {
        pub name: String,
        /// Results to return from search
        pub results: Vec<ProviderCandidate>,
        /// Records returned from fetch, keyed by id
        pub by_id: HashMap<String, CanonicalIssue>,
        /// Error to return (takes precedence over results)
        pub error: Option<ProviderError>,
        /// Number of calls that fail with `Unavailable` before succeeding
        pub failures_before_success: usize,
        /// Artificial latency per call
        pub delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl MockProvider {
        /// Create a mock that returns no matches.
        pub fn empty(name: &str) -> Self {
            Self {
                name: name.to_string(),
                results: vec![],
                by_id: HashMap::new(),
                error: None,
                failures_before_success: 0,
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        /// Create a mock whose search returns these issues, in order.
        pub fn with_results(name: &str, issues: Vec<CanonicalIssue>) -> Self {
            let results = issues
                .into_iter()
                .map(|issue| ProviderCandidate::new(name, issue))
                .collect();
            Self {
                results,
                ..Self::empty(name)
            }
        }

        /// Create a mock that always returns an error.
        pub fn with_error(name: &str, error: ProviderError) -> Self {
            Self {
                error: Some(error),
                ..Self::empty(name)
            }
        }

        /// Create a mock that fails `failures` times with `Unavailable`
        /// before returning `issues`.
        pub fn flaky(name: &str, failures: usize, issues: Vec<CanonicalIssue>) -> Self {
            Self {
                failures_before_success: failures,
                ..Self::with_results(name, issues)
            }
        }

        /// Add a record reachable through `fetch(id)`.
        pub fn with_issue(mut self, id: &str, issue: CanonicalIssue) -> Self {
            self.by_id.insert(id.to_string(), issue);
            self
        }

        /// Delay every call by `delay`.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Number of search/fetch calls received so far.
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn begin_call(&self) -> Result<(), ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(ref err) = self.error {
                return Err(err.clone());
            }
            if call < self.failures_before_success {
                return Err(ProviderError::Unavailable(format!(
                    "{} transient failure #{}",
                    self.name,
                    call + 1
                )));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl MetadataProvider for MockProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn search(
            &self,
            _hint: &SearchHint,
        ) -> Result<Vec<ProviderCandidate>, ProviderError> {
            self.begin_call().await?;
            Ok(self.results.clone())
        }

        async fn fetch(&self, id: &str) -> Result<CanonicalIssue, ProviderError> {
            self.begin_call().await?;
            self.by_id
                .get(id)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(id.to_string()))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::test_utils::sample_issue;

        #[tokio::test]
        async fn test_mock_empty() {
            let mock = MockProvider::empty("metron");
            let results = mock.search(&SearchHint::default()).await.unwrap();
            assert!(results.is_empty());
            assert_eq!(mock.call_count(), 1);
        }

        #[tokio::test]
        async fn test_mock_with_results() {
            let mock = MockProvider::with_results("metron", vec![sample_issue()]);
            let results = mock.search(&SearchHint::default()).await.unwrap();
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].provider, "metron");
        }

        #[tokio::test]
        async fn test_mock_error() {
            let mock =
                MockProvider::with_error("metron", ProviderError::Unavailable("timeout".into()));
            let result = mock.search(&SearchHint::default()).await;
            assert!(matches!(result, Err(ProviderError::Unavailable(_))));
        }

        #[tokio::test]
        async fn test_mock_flaky_recovers() {
            let mock = MockProvider::flaky("metron", 2, vec![sample_issue()]);
            assert!(mock.search(&SearchHint::default()).await.is_err());
            assert!(mock.search(&SearchHint::default()).await.is_err());
            assert_eq!(mock.search(&SearchHint::default()).await.unwrap().len(), 1);
        }

        #[tokio::test]
        async fn test_mock_fetch() {
            let mock = MockProvider::empty("metron").with_issue("42", sample_issue());
            assert!(mock.fetch("42").await.is_ok());
            assert!(matches!(
                mock.fetch("43").await,
                Err(ProviderError::NotFound(_))
            ));
        }
    }
}
