//! Per-archive pipeline and batch runner.
//!
//! One archive goes through:
//!
//! ```text
//! open → read existing tags → build hint → match → merge → render → commit → organize
//! ```
//!
//! Blocking work (archive IO, file moves) runs on the blocking pool. Every
//! archive gets an independent run; a failure is recorded as that archive's
//! [`Outcome`] and the batch moves on.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use futures::stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::archive::ArchiveOpener;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::matcher::{MatchHint, MatchSettings, Matcher};
use crate::metadata::{self, ExistingTags, TagError, TagWriter};
use crate::model::MergedMetadata;
use crate::organizer::{self, OrganizeError};
use crate::providers::MetadataProvider;
use crate::reconciler::Reconciler;
use crate::scanner::filename;

/// Per-run switches, usually from the command line.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Match and merge, but leave archives untouched
    pub dry_run: bool,
    /// Ignore the recheck window and rewrite unchanged tags
    pub force: bool,
    /// Move archives into the collection layout after tagging
    pub organize: bool,
    /// Overrides `output.collection_root`; organizing needs one of the two
    pub collection_root: Option<PathBuf>,
    /// Provider name → id for a single-archive run
    pub explicit_ids: BTreeMap<String, String>,
}

/// What happened to one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Tags rendered; `committed` is false on a dry run
    Tagged { committed: bool },
    Skipped(String),
    NoMatch,
    ValidationFailed(String),
    IoFailed(String),
    Cancelled,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tagged { committed: true } => write!(f, "tagged"),
            Self::Tagged { committed: false } => write!(f, "would tag"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
            Self::NoMatch => write!(f, "no match"),
            Self::ValidationFailed(reason) => write!(f, "validation failed: {reason}"),
            Self::IoFailed(reason) => write!(f, "failed: {reason}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result for one archive.
#[derive(Debug, Clone)]
pub struct ArchiveReport {
    pub path: PathBuf,
    pub outcome: Outcome,
    /// Merged record, when matching got that far
    pub merged: Option<MergedMetadata>,
    /// New location when the archive was repacked or (would be) organized
    pub destination: Option<PathBuf>,
}

impl ArchiveReport {
    fn new(path: PathBuf, outcome: Outcome) -> Self {
        Self {
            path,
            outcome,
            merged: None,
            destination: None,
        }
    }
}

/// Summary of a batch run, sorted by path.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub archives: Vec<ArchiveReport>,
}

impl BatchReport {
    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.archives.iter().filter(|r| predicate(&r.outcome)).count()
    }

    pub fn tagged(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Tagged { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    pub fn no_match(&self) -> usize {
        self.count(|o| matches!(o, Outcome::NoMatch))
    }

    pub fn validation_failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::ValidationFailed(_)))
    }

    pub fn io_failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::IoFailed(_)))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Cancelled))
    }

    /// Any archive ended without tags for a reason other than a skip
    pub fn has_failures(&self) -> bool {
        self.no_match() + self.validation_failed() + self.io_failed() > 0
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tagged, {} skipped, {} no match, {} invalid, {} errors, {} cancelled",
            self.tagged(),
            self.skipped(),
            self.no_match(),
            self.validation_failed(),
            self.io_failed(),
            self.cancelled()
        )
    }
}

/// Cancellation token that fires on Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing archives in flight");
            child.cancel();
        }
    });
    token
}

/// Runs the tagging pipeline for single archives or batches.
pub struct Pipeline {
    config: Arc<Config>,
    matcher: Matcher,
    reconciler: Reconciler,
    writer: TagWriter,
    opener: Arc<dyn ArchiveOpener>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        config: Arc<Config>,
        providers: Vec<Arc<dyn MetadataProvider>>,
        opener: Arc<dyn ArchiveOpener>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            matcher: Matcher::new(providers, MatchSettings::from(config.as_ref())),
            reconciler: Reconciler::new(config.precedence.clone()),
            writer: TagWriter::new(config.output.tag_options()),
            config,
            opener,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Process archives from `paths`, up to `batch.workers` at a time.
    ///
    /// Archives that have not started when `cancel` fires are reported as
    /// cancelled; archives already in flight finish.
    pub async fn run_batch<S>(&self, paths: S, cancel: &CancellationToken) -> BatchReport
    where
        S: Stream<Item = PathBuf>,
    {
        let workers = self.config.batch.workers.max(1);
        let mut archives: Vec<ArchiveReport> = paths
            .map(|path| {
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return ArchiveReport::new(path, Outcome::Cancelled);
                    }
                    self.process_archive(&path).await
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        archives.sort_by(|a, b| a.path.cmp(&b.path));
        let report = BatchReport { archives };
        info!(summary = %report, "Batch finished");
        report
    }

    /// Run the whole pipeline for one archive. Never fails; errors become
    /// the report's outcome.
    pub async fn process_archive(&self, path: &Path) -> ArchiveReport {
        debug!(path = ?path, "Processing archive");
        match self.try_process(path).await {
            Ok(report) => {
                info!(path = ?path, outcome = %report.outcome, "Archive done");
                report
            }
            Err(e) => {
                let outcome = failure_outcome(&e);
                warn!(path = ?path, outcome = %outcome, "Archive not tagged");
                ArchiveReport::new(path.to_path_buf(), outcome)
            }
        }
    }

    async fn try_process(&self, path: &Path) -> Result<ArchiveReport> {
        let root = if self.options.organize {
            Some(self.collection_root().ok_or(OrganizeError::NoCollectionRoot)?)
        } else {
            None
        };
        let existing = self.read_existing(path).await?;

        if !self.options.force
            && let Some(reason) = self.recently_tagged(existing.as_ref())
        {
            return Ok(ArchiveReport::new(path.to_path_buf(), Outcome::Skipped(reason)));
        }

        let hint = build_hint(path, existing.as_ref(), &self.options.explicit_ids);
        debug!(path = ?path, hint = ?hint, "Built match hint");

        let matches = self.matcher.find_matches(&hint).await;
        if matches.is_empty() && !matches.failures.is_empty() {
            warn!(
                path = ?path,
                failed = matches.failures.len(),
                "Every provider failed or returned nothing"
            );
        }
        let merged = self.reconciler.merge(&matches.accepted)?;

        if !self.options.force
            && let Some(existing) = &existing
            && existing.merged_at.is_some()
            && existing.issue == merged.issue
            && existing.provenance == merged.provenance
        {
            let mut report =
                ArchiveReport::new(path.to_path_buf(), Outcome::Skipped("unchanged".to_string()));
            report.merged = Some(merged);
            return Ok(report);
        }

        let (committed, written) = if self.options.dry_run {
            self.writer.render(&merged)?;
            (false, path.to_path_buf())
        } else {
            (true, self.commit(path, merged.clone()).await?)
        };

        let destination = match root {
            Some(root) => Some(self.organize(&written, &merged, root).await?),
            None => (written != path).then_some(written),
        };

        Ok(ArchiveReport {
            path: path.to_path_buf(),
            outcome: Outcome::Tagged { committed },
            merged: Some(merged),
            destination,
        })
    }

    async fn read_existing(&self, path: &Path) -> Result<Option<ExistingTags>> {
        let opener = Arc::clone(&self.opener);
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<Option<ExistingTags>> {
            let mut archive = opener.open(&path)?;
            match metadata::read_existing(archive.as_mut()) {
                Ok(tags) => Ok(tags),
                Err(TagError::Archive(e)) => Err(e.into()),
                Err(e) => {
                    warn!(path = ?path, error = %e, "Ignoring unreadable embedded tags");
                    Ok(None)
                }
            }
        })
        .await?
    }

    fn recently_tagged(&self, existing: Option<&ExistingTags>) -> Option<String> {
        let days = self.config.batch.recheck_after_days;
        let merged_at = existing?.merged_at?;
        if days == 0 {
            return None;
        }
        let age = Utc::now() - merged_at;
        (age < TimeDelta::days(i64::from(days)))
            .then(|| format!("tagged {} day(s) ago", age.num_days()))
    }

    /// Embed tags, repacking the container first when it can't be written.
    /// Returns the archive's path after the write.
    async fn commit(&self, path: &Path, merged: MergedMetadata) -> Result<PathBuf> {
        let opener = Arc::clone(&self.opener);
        let writer = self.writer;
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<PathBuf> {
            let path = opener.prepare_for_write(&path)?;
            let mut archive = opener.open(&path)?;
            writer.write(archive.as_mut(), &merged)?;
            Ok(path)
        })
        .await?
    }

    fn collection_root(&self) -> Option<PathBuf> {
        self.options
            .collection_root
            .clone()
            .or_else(|| self.config.output.collection_root.clone())
    }

    async fn organize(&self, path: &Path, merged: &MergedMetadata, root: PathBuf) -> Result<PathBuf> {
        let pattern = self.config.output.naming_pattern.clone();

        if self.options.dry_run {
            let preview = organizer::preview_organize(path, &merged.issue, &pattern, &root);
            return Ok(preview.destination);
        }

        let issue = merged.issue.clone();
        let path = path.to_path_buf();
        let destination = tokio::task::spawn_blocking(move || {
            organizer::organize_archive(&path, &issue, &pattern, &root)
        })
        .await??;
        info!(destination = ?destination, "Archive organized");
        Ok(destination)
    }
}

/// Combine filename hints, embedded tags and explicit ids.
///
/// Embedded identifiers become explicit ids; explicit ids given for the run
/// override them. Embedded series/number/year/volume only fill gaps the
/// filename left.
pub fn build_hint(
    path: &Path,
    existing: Option<&ExistingTags>,
    explicit_ids: &BTreeMap<String, String>,
) -> MatchHint {
    let mut search = filename::parse(path);
    let mut ids = BTreeMap::new();

    if let Some(existing) = existing {
        let issue = &existing.issue;
        if search.series.is_none() {
            search.series = issue.series_title.clone();
        }
        if search.issue_number.is_none() {
            search.issue_number = issue.issue_number.as_str().map(String::from);
        }
        if search.year.is_none() {
            search.year = issue.year();
        }
        if search.volume.is_none() {
            search.volume = issue.series_volume;
        }
        ids.extend(issue.identifiers.clone());
    }
    ids.extend(explicit_ids.clone());

    MatchHint {
        search,
        explicit_ids: ids,
    }
}

fn failure_outcome(error: &Error) -> Outcome {
    match error.root() {
        Error::Reconcile(_) => Outcome::NoMatch,
        Error::Validation(e) | Error::Tag(TagError::Validation(e)) => {
            Outcome::ValidationFailed(e.to_string())
        }
        e if e.is_io() => Outcome::IoFailed(error.to_string()),
        Error::Tag(e) => Outcome::ValidationFailed(e.to_string()),
        _ => Outcome::IoFailed(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{CbzArchive, ComicArchive, FsOpener};
    use crate::metadata::{comic_info, sidecar};
    use crate::model::{CanonicalIssue, IssueNumber};
    use crate::providers::traits::mocks::MockProvider;
    use crate::providers::ProviderError;
    use crate::test_utils::{sample_issue, write_cbz};
    use tempfile::TempDir;

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.retry.max_retries = 0;
        config.retry.backoff_base_ms = 1;
        config
    }

    fn pipeline(providers: Vec<Arc<dyn MetadataProvider>>, options: PipelineOptions) -> Pipeline {
        Pipeline::new(Arc::new(fast_config()), providers, Arc::new(FsOpener), options)
    }

    fn archive_in(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        write_cbz(&path, &[("page01.jpg", b"image one"), ("page02.jpg", b"image two")]);
        path
    }

    fn cbt_in(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut builder = tar::Builder::new(std::fs::File::create(&path).unwrap());
        let mut header = tar::Header::new_gnu();
        header.set_size(5);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "page01.jpg", b"image".as_slice()).unwrap();
        builder.finish().unwrap();
        path
    }

    fn entries(path: &Path) -> Vec<String> {
        let mut names = CbzArchive::open(path).unwrap().list_entries().unwrap();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_tags_archive_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = archive_in(&dir, "Example Comic 001 (2020).cbz");
        let provider = Arc::new(MockProvider::with_results("metron", vec![sample_issue()]));

        let report = pipeline(vec![provider], PipelineOptions::default())
            .process_archive(&path)
            .await;

        assert_eq!(report.outcome, Outcome::Tagged { committed: true });
        let mut archive = CbzArchive::open(&path).unwrap();
        let xml = archive.read_entry(comic_info::ENTRY_NAME).unwrap();
        let from_xml = comic_info::parse(&xml).unwrap();
        assert_eq!(from_xml.series_title, sample_issue().series_title);
        assert_eq!(from_xml.credits, sample_issue().credits);
        let json = archive.read_entry(sidecar::ENTRY_NAME).unwrap();
        assert!(sidecar::parse(&json).unwrap().same_content(report.merged.as_ref().unwrap()));
        assert_eq!(archive.read_entry("page02.jpg").unwrap(), b"image two");
    }

    #[tokio::test]
    async fn test_all_providers_unavailable_is_no_match_without_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = archive_in(&dir, "Example Comic 001 (2020).cbz");
        let before = std::fs::read(&path).unwrap();
        let providers: Vec<Arc<dyn MetadataProvider>> = vec![
            Arc::new(MockProvider::with_error(
                "metron",
                ProviderError::Unavailable("503".to_string()),
            )),
            Arc::new(MockProvider::with_error(
                "comicvine",
                ProviderError::Unavailable("timeout".to_string()),
            )),
        ];

        let report = pipeline(providers, PipelineOptions::default())
            .process_archive(&path)
            .await;

        assert_eq!(report.outcome, Outcome::NoMatch);
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_batch_continues_after_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = archive_in(&dir, "Example Comic 001 (2020).cbz");
        let broken = dir.path().join("Broken 001.cbz");
        std::fs::write(&broken, b"not a zip at all").unwrap();
        let unmatched = archive_in(&dir, "Unrelated Title 500.cbz");

        let provider = MockProvider::with_results("metron", vec![sample_issue()]);
        let pipeline = pipeline(vec![Arc::new(provider)], PipelineOptions::default());
        let paths = futures::stream::iter(vec![good.clone(), broken.clone(), unmatched.clone()]);

        let report = pipeline.run_batch(paths, &CancellationToken::new()).await;

        assert_eq!(report.archives.len(), 3);
        assert_eq!(report.tagged(), 1);
        assert_eq!(report.io_failed(), 1);
        assert_eq!(report.no_match(), 1);
        assert!(report.has_failures());
        let outcome_of = |p: &Path| {
            report
                .archives
                .iter()
                .find(|r| r.path == p)
                .map(|r| r.outcome.clone())
        };
        assert_eq!(outcome_of(&good), Some(Outcome::Tagged { committed: true }));
        assert!(matches!(outcome_of(&broken), Some(Outcome::IoFailed(_))));
        assert_eq!(outcome_of(&unmatched), Some(Outcome::NoMatch));
    }

    #[tokio::test]
    async fn test_dry_run_leaves_archive_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = archive_in(&dir, "Example Comic 001 (2020).cbz");
        let provider = Arc::new(MockProvider::with_results("metron", vec![sample_issue()]));
        let options = PipelineOptions {
            dry_run: true,
            ..Default::default()
        };

        let report = pipeline(vec![provider], options).process_archive(&path).await;

        assert_eq!(report.outcome, Outcome::Tagged { committed: false });
        assert!(report.merged.is_some());
        assert_eq!(entries(&path), vec!["page01.jpg", "page02.jpg"]);
    }

    #[tokio::test]
    async fn test_invalid_merge_is_validation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = archive_in(&dir, "Example Comic 001 (2020).cbz");
        let broken = CanonicalIssue {
            rating: Some("   ".to_string()),
            ..sample_issue()
        };
        let provider = Arc::new(MockProvider::with_results("metron", vec![broken]));

        let report = pipeline(vec![provider], PipelineOptions::default())
            .process_archive(&path)
            .await;

        assert!(matches!(report.outcome, Outcome::ValidationFailed(_)));
        assert_eq!(entries(&path), vec!["page01.jpg", "page02.jpg"]);
    }

    #[tokio::test]
    async fn test_recently_tagged_archive_is_skipped_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let path = archive_in(&dir, "Example Comic 001 (2020).cbz");
        let provider = Arc::new(MockProvider::with_results("metron", vec![sample_issue()]));

        let first = pipeline(vec![provider.clone()], PipelineOptions::default());
        assert_eq!(
            first.process_archive(&path).await.outcome,
            Outcome::Tagged { committed: true }
        );

        let again = first.process_archive(&path).await;
        assert!(matches!(again.outcome, Outcome::Skipped(_)));
        assert_eq!(provider.call_count(), 1);

        let forced = pipeline(
            vec![provider.clone()],
            PipelineOptions {
                force: true,
                ..Default::default()
            },
        );
        assert_eq!(
            forced.process_archive(&path).await.outcome,
            Outcome::Tagged { committed: true }
        );
    }

    #[tokio::test]
    async fn test_embedded_identifiers_drive_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan0001.cbz");
        let mut tagged = CanonicalIssue {
            summary: None,
            ..sample_issue()
        };
        tagged.identifiers.insert("metron".to_string(), "42".to_string());
        let xml = comic_info::render(&tagged).unwrap();
        write_cbz(&path, &[("page01.jpg", b"image"), (comic_info::ENTRY_NAME, &xml)]);

        let mut full = sample_issue();
        full.identifiers.insert("metron".to_string(), "42".to_string());
        let provider = Arc::new(MockProvider::empty("metron").with_issue("42", full.clone()));

        let report = pipeline(vec![provider.clone()], PipelineOptions::default())
            .process_archive(&path)
            .await;

        assert_eq!(report.outcome, Outcome::Tagged { committed: true });
        assert_eq!(report.merged.unwrap().issue, full);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_organize_moves_tagged_archive() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = dir.path().join("inbox");
        std::fs::create_dir_all(&inbox).unwrap();
        let path = inbox.join("Example Comic 001 (2020).cbz");
        write_cbz(&path, &[("page01.jpg", b"image")]);
        let collection = dir.path().join("collection");

        let provider = Arc::new(MockProvider::with_results("metron", vec![sample_issue()]));
        let options = PipelineOptions {
            organize: true,
            collection_root: Some(collection.clone()),
            ..Default::default()
        };

        let report = pipeline(vec![provider], options).process_archive(&path).await;

        let expected = collection
            .join("Example Press")
            .join("Example Comic")
            .join("Example Comic_#001.cbz");
        assert_eq!(report.destination.as_deref(), Some(expected.as_path()));
        assert!(expected.exists());
        assert!(!path.exists());
        assert!(entries(&expected).contains(&comic_info::ENTRY_NAME.to_string()));
    }

    #[tokio::test]
    async fn test_cbt_archive_is_repacked_and_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = cbt_in(&dir, "Example Comic 001 (2020).cbt");
        let provider = Arc::new(MockProvider::with_results("metron", vec![sample_issue()]));

        let report = pipeline(vec![provider], PipelineOptions::default())
            .process_archive(&path)
            .await;

        let cbz = dir.path().join("Example Comic 001 (2020).cbz");
        assert_eq!(report.outcome, Outcome::Tagged { committed: true });
        assert_eq!(report.destination.as_deref(), Some(cbz.as_path()));
        assert!(!path.exists());
        assert!(entries(&cbz).contains(&comic_info::ENTRY_NAME.to_string()));
        assert!(entries(&cbz).contains(&"page01.jpg".to_string()));
    }

    #[tokio::test]
    async fn test_cbt_dry_run_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = cbt_in(&dir, "Example Comic 001 (2020).cbt");
        let before = std::fs::read(&path).unwrap();
        let provider = Arc::new(MockProvider::with_results("metron", vec![sample_issue()]));
        let options = PipelineOptions {
            dry_run: true,
            ..Default::default()
        };

        let report = pipeline(vec![provider], options).process_archive(&path).await;

        assert_eq!(report.outcome, Outcome::Tagged { committed: false });
        assert_eq!(report.destination, None);
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_organizing_twice_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let path = archive_in(&dir, "Example Comic 001 (2020).cbz");
        let provider = Arc::new(MockProvider::with_results("metron", vec![sample_issue()]));
        let options = PipelineOptions {
            organize: true,
            force: true,
            collection_root: Some(root.clone()),
            ..Default::default()
        };
        let pipeline = pipeline(vec![provider], options);
        let expected = root
            .join("Example Press")
            .join("Example Comic")
            .join("Example Comic_#001.cbz");

        let first = pipeline.process_archive(&path).await;
        assert_eq!(first.destination.as_deref(), Some(expected.as_path()));

        let second = pipeline.process_archive(&expected).await;
        assert_eq!(second.outcome, Outcome::Tagged { committed: true });
        assert_eq!(second.destination.as_deref(), Some(expected.as_path()));
        assert!(expected.exists());
        assert!(!root.join("Example Press").join("Example Comic").join("Example Press").exists());
    }

    #[tokio::test]
    async fn test_organize_without_root_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = archive_in(&dir, "Example Comic 001 (2020).cbz");
        let provider = Arc::new(MockProvider::with_results("metron", vec![sample_issue()]));
        let options = PipelineOptions {
            organize: true,
            ..Default::default()
        };

        let report = pipeline(vec![provider.clone()], options).process_archive(&path).await;

        assert!(matches!(report.outcome, Outcome::IoFailed(_)));
        assert_eq!(provider.call_count(), 0);
        assert_eq!(entries(&path), vec!["page01.jpg", "page02.jpg"]);
    }

    #[tokio::test]
    async fn test_cancelled_batch_reports_unstarted_archives() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            archive_in(&dir, "Example Comic 001.cbz"),
            archive_in(&dir, "Example Comic 002.cbz"),
        ];
        let provider = Arc::new(MockProvider::with_results("metron", vec![sample_issue()]));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = pipeline(vec![provider.clone()], PipelineOptions::default())
            .run_batch(futures::stream::iter(paths.clone()), &cancel)
            .await;

        assert_eq!(report.cancelled(), 2);
        assert_eq!(provider.call_count(), 0);
        for path in &paths {
            assert_eq!(entries(path), vec!["page01.jpg", "page02.jpg"]);
        }
    }

    #[test]
    fn test_build_hint_merges_sources() {
        let mut issue = CanonicalIssue {
            series_title: Some("Embedded Series".to_string()),
            issue_number: IssueNumber::known("9"),
            ..sample_issue()
        };
        issue.identifiers.insert("metron".to_string(), "1".to_string());
        issue.identifiers.insert("comicvine".to_string(), "2".to_string());
        let existing = ExistingTags {
            issue,
            provenance: Default::default(),
            merged_at: None,
        };
        let cli_ids = BTreeMap::from([("comicvine".to_string(), "99".to_string())]);

        let hint = build_hint(Path::new("/comics/scan_0001.cbz"), Some(&existing), &cli_ids);

        // The filename parser reads "scan 0001" as series + number
        assert_eq!(hint.search.series.as_deref(), Some("scan"));
        assert_eq!(hint.search.issue_number.as_deref(), Some("1"));
        assert_eq!(hint.search.year, Some(2020));
        assert_eq!(hint.explicit_ids.get("metron").map(String::as_str), Some("1"));
        assert_eq!(hint.explicit_ids.get("comicvine").map(String::as_str), Some("99"));
    }

    #[test]
    fn test_batch_report_summary() {
        let report = BatchReport {
            archives: vec![
                ArchiveReport::new("a.cbz".into(), Outcome::Tagged { committed: true }),
                ArchiveReport::new("b.cbz".into(), Outcome::NoMatch),
                ArchiveReport::new("c.cbz".into(), Outcome::Cancelled),
            ],
        };
        assert_eq!(
            report.to_string(),
            "1 tagged, 0 skipped, 1 no match, 0 invalid, 0 errors, 1 cancelled"
        );
        assert!(report.has_failures());

        let clean = BatchReport {
            archives: vec![
                ArchiveReport::new("a.cbz".into(), Outcome::Tagged { committed: true }),
                ArchiveReport::new("b.cbz".into(), Outcome::Skipped("unchanged".into())),
                ArchiveReport::new("c.cbz".into(), Outcome::Cancelled),
            ],
        };
        assert!(!clean.has_failures());
    }

    #[test]
    fn test_no_match_alone_is_a_failure() {
        let report = BatchReport {
            archives: vec![ArchiveReport::new("a.cbz".into(), Outcome::NoMatch)],
        };
        assert!(report.has_failures());
    }
}
