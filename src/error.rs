//! Application-wide error types.
//!
//! This module provides a unified error hierarchy for the application.
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level application error enum
//! - Module-specific errors (e.g., [`ProviderError`], [`TagError`]) for
//!   detailed handling
//! - All errors implement `std::error::Error` for compatibility

use std::path::PathBuf;

use crate::archive::ArchiveError;
use crate::config::ConfigError;
use crate::metadata::TagError;
use crate::model::ValidationError;
use crate::organizer::OrganizeError;
use crate::providers::ProviderError;
use crate::reconciler::ReconcileError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
///
/// Aggregates errors from all subsystems for unified handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata provider error
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Merged record failed schema validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Nothing to merge
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Tag reading/writing error
    #[error("Tag error: {0}")]
    Tag(#[from] TagError),

    /// Archive container error
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// File organization error
    #[error("Organization error: {0}")]
    Organization(#[from] OrganizeError),

    /// File not found
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Background task panicked or was aborted
    #[error("Task join error: {0}")]
    TaskJoin(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a not found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the failure came from the file or container rather than
    /// from the metadata.
    pub fn is_io(&self) -> bool {
        match self.root() {
            Self::Io(_) | Self::Archive(_) | Self::Organization(_) | Self::NotFound(_) => true,
            Self::Tag(TagError::Archive(_)) => true,
            _ => false,
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::TaskJoin(e.to_string())
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, ArchiveError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Archive(e).context(ctx))
    }
}
