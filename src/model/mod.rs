//! Canonical metadata model for comic issues.
//!
//! Every provider adapter converts its native records into [`CanonicalIssue`].
//! The matcher, reconciler and tag writers only ever work with these types,
//! so provider schema changes stop at the adapter boundary.
//!
//! # Absent vs. empty
//!
//! A field that a provider did not supply is `None` (or
//! [`IssueNumber::Unknown`] for the issue number). An empty string is never
//! a valid value; [`CanonicalIssue::validate`] rejects it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Issue number as reported by a provider.
///
/// Issue numbers are strings because comics use values like `"1.5"`,
/// `"12a"` or `"Annual"`. Providers that report no number produce
/// [`IssueNumber::Unknown`] rather than an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum IssueNumber {
    Known(String),
    #[default]
    Unknown,
}

impl IssueNumber {
    /// Create a known issue number as-is (no trimming).
    pub fn known(value: impl Into<String>) -> Self {
        Self::Known(value.into())
    }

    /// Normalize a provider value: missing or blank becomes `Unknown`.
    pub fn from_provider(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if !value.is_empty() => Self::Known(value.to_string()),
            _ => Self::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown => None,
        }
    }

    /// Comparison key used by the matcher (see [`normalize_issue_number`]).
    pub fn normalized(&self) -> Option<String> {
        self.as_str().map(normalize_issue_number)
    }
}

impl From<Option<String>> for IssueNumber {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(value) => Self::Known(value),
            None => Self::Unknown,
        }
    }
}

impl From<IssueNumber> for Option<String> {
    fn from(value: IssueNumber) -> Self {
        match value {
            IssueNumber::Known(value) => Some(value),
            IssueNumber::Unknown => None,
        }
    }
}

impl fmt::Display for IssueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(value) => f.write_str(value),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Normalize an issue number for equality checks.
///
/// Strips a leading `#`, leading zeros of the numeric part and trailing
/// zeros of a decimal part, and lowercases the rest:
/// `"#001"` → `"1"`, `"1.50"` → `"1.5"`, `"12A"` → `"12a"`.
pub fn normalize_issue_number(raw: &str) -> String {
    let lowered = raw.trim().trim_start_matches('#').trim().to_lowercase();
    let digits_end = lowered
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lowered.len());
    if digits_end == 0 {
        return lowered;
    }

    let (int_part, rest) = lowered.split_at(digits_end);
    let int_part = match int_part.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };
    let rest = match rest.strip_prefix('.') {
        Some(fraction) => {
            let fraction_end = fraction
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(fraction.len());
            let (digits, suffix) = fraction.split_at(fraction_end);
            let digits = digits.trim_end_matches('0');
            if digits.is_empty() {
                suffix.to_string()
            } else {
                format!(".{digits}{suffix}")
            }
        }
        None => rest.to_string(),
    };
    format!("{int_part}{rest}")
}

/// Publication format of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueFormat {
    Comic,
    Annual,
    #[serde(rename = "Digital Chapter")]
    DigitalChapter,
    #[serde(rename = "Graphic Novel")]
    GraphicNovel,
    Hardcover,
    #[serde(rename = "Trade Paperback")]
    TradePaperback,
}

impl IssueFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comic => "Comic",
            Self::Annual => "Annual",
            Self::DigitalChapter => "Digital Chapter",
            Self::GraphicNovel => "Graphic Novel",
            Self::Hardcover => "Hardcover",
            Self::TradePaperback => "Trade Paperback",
        }
    }

    /// Lenient parse of provider/series-type names ("Annual Series",
    /// "Hard Cover", "TPB", ...).
    pub fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "" => None,
            "tpb" | "tp" => Some(Self::TradePaperback),
            "gn" | "ogn" => Some(Self::GraphicNovel),
            "hc" => Some(Self::Hardcover),
            k if k.contains("annual") => Some(Self::Annual),
            k if k.contains("digital") || k.contains("chapter") => Some(Self::DigitalChapter),
            k if k.contains("graphicnovel") => Some(Self::GraphicNovel),
            k if k.contains("hardcover") => Some(Self::Hardcover),
            k if k.contains("tradepaperback") => Some(Self::TradePaperback),
            k if k.contains("comic") || k.contains("single") || k.contains("ongoing")
                || k.contains("limited") || k.contains("oneshot") || k.contains("cancelled") =>
            {
                Some(Self::Comic)
            }
            _ => None,
        }
    }
}

impl fmt::Display for IssueFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single creator credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub role: String,
    pub name: String,
}

impl Credit {
    pub fn new(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            name: name.into(),
        }
    }
}

/// The unified record for one comic issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_title: Option<String>,
    /// Series volume number (or start year, depending on the provider)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_volume: Option<u32>,
    #[serde(skip_serializing_if = "IssueNumber::is_unknown")]
    pub issue_number: IssueNumber,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<IssueFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub credits: Vec<Credit>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub characters: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub teams: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub story_arcs: Vec<String>,
    /// Provider name → provider-native identifier
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub identifiers: BTreeMap<String, String>,
}

impl CanonicalIssue {
    pub fn has_series(&self) -> bool {
        self.series_title.is_some()
    }

    pub fn has_issue_number(&self) -> bool {
        self.issue_number.is_known()
    }

    /// Exactly one of series title / issue number is present.
    pub fn is_partial(&self) -> bool {
        self.has_series() != self.has_issue_number()
    }

    /// Any descriptive field besides series title, issue number and
    /// identifiers is populated.
    pub fn has_corroborating_field(&self) -> bool {
        self.series_volume.is_some()
            || self.issue_title.is_some()
            || self.release_date.is_some()
            || self.summary.is_some()
            || self.publisher.is_some()
            || self.format.is_some()
            || self.rating.is_some()
            || self.cover_url.is_some()
            || self.web_url.is_some()
            || !self.credits.is_empty()
            || !self.genres.is_empty()
            || !self.characters.is_empty()
            || !self.teams.is_empty()
            || !self.locations.is_empty()
            || !self.story_arcs.is_empty()
    }

    /// Whether this record may serve as a basis for merged output.
    pub fn is_mergeable(&self) -> bool {
        match (self.has_series(), self.has_issue_number()) {
            (true, true) => true,
            (false, false) => false,
            _ => self.has_corroborating_field(),
        }
    }

    /// Release year, if a release date is known.
    pub fn year(&self) -> Option<i32> {
        self.release_date.map(|d| d.year())
    }

    /// Check the record against the schema rules.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let IssueNumber::Known(number) = &self.issue_number
            && number.trim().is_empty()
        {
            return Err(ValidationError::EmptyField(Field::IssueNumber));
        }

        let scalars = [
            (Field::SeriesTitle, &self.series_title),
            (Field::IssueTitle, &self.issue_title),
            (Field::Summary, &self.summary),
            (Field::Publisher, &self.publisher),
            (Field::Rating, &self.rating),
            (Field::CoverUrl, &self.cover_url),
            (Field::WebUrl, &self.web_url),
        ];
        for (field, value) in scalars {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ValidationError::EmptyField(field));
            }
        }

        if self.series_volume == Some(0) {
            return Err(ValidationError::ZeroVolume);
        }

        for (index, credit) in self.credits.iter().enumerate() {
            if credit.role.trim().is_empty() {
                return Err(ValidationError::EmptyCredit { index, part: "role" });
            }
            if credit.name.trim().is_empty() {
                return Err(ValidationError::EmptyCredit { index, part: "name" });
            }
        }

        let lists = [
            (Field::Genres, &self.genres),
            (Field::Characters, &self.characters),
            (Field::Teams, &self.teams),
            (Field::Locations, &self.locations),
            (Field::StoryArcs, &self.story_arcs),
        ];
        for (field, values) in lists {
            if values.iter().any(|v| v.trim().is_empty()) {
                return Err(ValidationError::EmptyField(field));
            }
        }

        if self
            .identifiers
            .iter()
            .any(|(provider, id)| provider.trim().is_empty() || id.trim().is_empty())
        {
            return Err(ValidationError::EmptyField(Field::Identifiers));
        }

        match (self.has_series(), self.has_issue_number()) {
            (false, false) => Err(ValidationError::MissingIdentity),
            (true, false) if !self.has_corroborating_field() => {
                Err(ValidationError::Uncorroborated(Field::SeriesTitle))
            }
            (false, true) if !self.has_corroborating_field() => {
                Err(ValidationError::Uncorroborated(Field::IssueNumber))
            }
            _ => Ok(()),
        }
    }
}

/// Names of the [`CanonicalIssue`] fields, used for precedence and provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    SeriesTitle,
    SeriesVolume,
    IssueNumber,
    IssueTitle,
    ReleaseDate,
    Summary,
    Publisher,
    Format,
    Rating,
    CoverUrl,
    WebUrl,
    Credits,
    Genres,
    Characters,
    Teams,
    Locations,
    StoryArcs,
    Identifiers,
}

impl Field {
    pub const ALL: [Field; 18] = [
        Field::SeriesTitle,
        Field::SeriesVolume,
        Field::IssueNumber,
        Field::IssueTitle,
        Field::ReleaseDate,
        Field::Summary,
        Field::Publisher,
        Field::Format,
        Field::Rating,
        Field::CoverUrl,
        Field::WebUrl,
        Field::Credits,
        Field::Genres,
        Field::Characters,
        Field::Teams,
        Field::Locations,
        Field::StoryArcs,
        Field::Identifiers,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::SeriesTitle => "series_title",
            Field::SeriesVolume => "series_volume",
            Field::IssueNumber => "issue_number",
            Field::IssueTitle => "issue_title",
            Field::ReleaseDate => "release_date",
            Field::Summary => "summary",
            Field::Publisher => "publisher",
            Field::Format => "format",
            Field::Rating => "rating",
            Field::CoverUrl => "cover_url",
            Field::WebUrl => "web_url",
            Field::Credits => "credits",
            Field::Genres => "genres",
            Field::Characters => "characters",
            Field::Teams => "teams",
            Field::Locations => "locations",
            Field::StoryArcs => "story_arcs",
            Field::Identifiers => "identifiers",
        }
    }

    pub fn parse(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }

    /// List-valued fields are unioned across providers instead of
    /// first-wins.
    pub fn is_list(self) -> bool {
        matches!(
            self,
            Field::Credits
                | Field::Genres
                | Field::Characters
                | Field::Teams
                | Field::Locations
                | Field::StoryArcs
                | Field::Identifiers
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Schema violations found by [`CanonicalIssue::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is present but empty")]
    EmptyField(Field),

    #[error("record has neither a series title nor an issue number")]
    MissingIdentity,

    #[error("record only has a {0} and no corroborating field")]
    Uncorroborated(Field),

    #[error("credit #{index} has an empty {part}")]
    EmptyCredit { index: usize, part: &'static str },

    #[error("series volume must be at least 1")]
    ZeroVolume,
}

/// A provider's answer for one matching pass.
#[derive(Debug, Clone)]
pub struct ProviderCandidate {
    /// Name of the provider that produced this candidate
    pub provider: String,
    /// Match confidence (0.0 to 1.0)
    pub confidence: f32,
    /// The translated record
    pub issue: CanonicalIssue,
    /// Provider-native response, kept for debugging only
    pub raw: Option<serde_json::Value>,
}

impl ProviderCandidate {
    pub fn new(provider: impl Into<String>, issue: CanonicalIssue) -> Self {
        Self {
            provider: provider.into(),
            confidence: 1.0,
            issue,
            raw: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_raw(mut self, raw: Option<serde_json::Value>) -> Self {
        self.raw = raw;
        self
    }
}

/// Which provider(s) supplied a merged field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Provenance {
    /// Winning provider of a scalar field
    Single(String),
    /// Contributing providers of a unioned list field
    Union(Vec<String>),
}

/// Field name → provenance for a merged record.
pub type FieldProvenance = BTreeMap<Field, Provenance>;

/// Output of the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedMetadata {
    pub issue: CanonicalIssue,
    #[serde(default)]
    pub provenance: FieldProvenance,
    pub merged_at: DateTime<Utc>,
}

impl MergedMetadata {
    /// Equality ignoring the merge timestamp.
    pub fn same_content(&self, other: &MergedMetadata) -> bool {
        self.issue == other.issue && self.provenance == other.provenance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_issue;

    #[test]
    fn test_normalize_issue_number() {
        assert_eq!(normalize_issue_number("#001"), "1");
        assert_eq!(normalize_issue_number(" 12 "), "12");
        assert_eq!(normalize_issue_number("1.50"), "1.5");
        assert_eq!(normalize_issue_number("1.0"), "1");
        assert_eq!(normalize_issue_number("000"), "0");
        assert_eq!(normalize_issue_number("12A"), "12a");
        assert_eq!(normalize_issue_number("Annual"), "annual");
    }

    #[test]
    fn test_issue_number_from_provider_uses_sentinel() {
        assert_eq!(IssueNumber::from_provider(None), IssueNumber::Unknown);
        assert_eq!(IssueNumber::from_provider(Some("")), IssueNumber::Unknown);
        assert_eq!(IssueNumber::from_provider(Some("  ")), IssueNumber::Unknown);
        assert_eq!(
            IssueNumber::from_provider(Some(" 3 ")),
            IssueNumber::known("3")
        );
    }

    #[test]
    fn test_issue_format_parse() {
        assert_eq!(IssueFormat::parse("Annual Series"), Some(IssueFormat::Annual));
        assert_eq!(IssueFormat::parse("TPB"), Some(IssueFormat::TradePaperback));
        assert_eq!(IssueFormat::parse("Hard Cover"), Some(IssueFormat::Hardcover));
        assert_eq!(IssueFormat::parse("Ongoing Series"), Some(IssueFormat::Comic));
        assert_eq!(IssueFormat::parse(""), None);
    }

    #[test]
    fn test_validate_accepts_sample() {
        assert_eq!(sample_issue().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_empty_issue_number() {
        let issue = CanonicalIssue {
            issue_number: IssueNumber::known(""),
            ..sample_issue()
        };
        assert_eq!(
            issue.validate(),
            Err(ValidationError::EmptyField(Field::IssueNumber))
        );
    }

    #[test]
    fn test_validate_rejects_missing_identity() {
        let issue = CanonicalIssue {
            series_title: None,
            issue_number: IssueNumber::Unknown,
            ..sample_issue()
        };
        assert_eq!(issue.validate(), Err(ValidationError::MissingIdentity));
    }

    #[test]
    fn test_partial_record_needs_corroboration() {
        let bare = CanonicalIssue {
            series_title: Some("Example Comic".to_string()),
            ..Default::default()
        };
        assert!(bare.is_partial());
        assert!(!bare.is_mergeable());
        assert_eq!(
            bare.validate(),
            Err(ValidationError::Uncorroborated(Field::SeriesTitle))
        );

        let corroborated = CanonicalIssue {
            publisher: Some("Example Press".to_string()),
            ..bare
        };
        assert!(corroborated.is_mergeable());
        assert_eq!(corroborated.validate(), Ok(()));
    }

    #[test]
    fn test_identifiers_do_not_corroborate() {
        let mut issue = CanonicalIssue {
            issue_number: IssueNumber::known("1"),
            ..Default::default()
        };
        issue.identifiers.insert("metron".to_string(), "42".to_string());
        assert!(!issue.is_mergeable());
    }

    #[test]
    fn test_unknown_issue_number_is_not_serialized() {
        let issue = CanonicalIssue {
            series_title: Some("Example Comic".to_string()),
            publisher: Some("Example Press".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert!(json.get("issue_number").is_none());

        let parsed: CanonicalIssue = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.issue_number, IssueNumber::Unknown);
    }

    #[test]
    fn test_field_names_roundtrip() {
        for field in Field::ALL {
            assert_eq!(Field::parse(field.name()), Some(field));
        }
        assert_eq!(Field::parse("cover"), None);
    }

    #[test]
    fn test_provenance_serde_shapes() {
        let mut provenance = FieldProvenance::new();
        provenance.insert(Field::IssueTitle, Provenance::Single("metron".to_string()));
        provenance.insert(
            Field::Credits,
            Provenance::Union(vec!["metron".to_string(), "comicvine".to_string()]),
        );
        let json = serde_json::to_string(&provenance).unwrap();
        assert_eq!(
            json,
            r#"{"issue_title":"metron","credits":["metron","comicvine"]}"#
        );
        let parsed: FieldProvenance = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, provenance);
    }

    #[test]
    fn test_candidate_confidence_is_clamped() {
        let candidate = ProviderCandidate::new("metron", sample_issue()).with_confidence(1.7);
        assert_eq!(candidate.confidence, 1.0);
    }
}
