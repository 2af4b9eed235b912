//! Adapter layer: Convert Comic Vine DTOs to canonical records
//!
//! This is the ONLY place where Comic Vine DTO types are converted to
//! canonical types.

use std::sync::LazyLock;

use regex::Regex;

use super::dto;
use crate::model::{CanonicalIssue, Credit, IssueNumber, ProviderCandidate};
use crate::providers::domain::{clean_list, clean_text, parse_date, title_case, ProviderError};

/// Name used for precedence, provenance and identifiers
pub const PROVIDER_NAME: &str = "comicvine";

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid HTML tag pattern"));

/// Check the envelope status before decoding the payload.
pub fn check_status(status: &dto::Status, request: &str) -> Result<(), ProviderError> {
    match status.status_code {
        dto::STATUS_OK => Ok(()),
        dto::STATUS_OBJECT_NOT_FOUND => Err(ProviderError::NotFound(request.to_string())),
        dto::STATUS_RATE_LIMITED => Err(ProviderError::Unavailable(status.error.clone())),
        dto::STATUS_INVALID_API_KEY | dto::STATUS_FILTER_ERROR => {
            Err(ProviderError::Rejected(status.error.clone()))
        }
        other => Err(ProviderError::SchemaMismatch(format!(
            "unexpected status_code {other}: {}",
            status.error
        ))),
    }
}

/// Convert an issue record into a canonical issue
pub fn to_issue(issue: dto::Issue) -> CanonicalIssue {
    let mut canonical = CanonicalIssue {
        series_title: clean_text(issue.volume.and_then(|v| v.name)),
        issue_number: IssueNumber::from_provider(issue.issue_number.as_deref()),
        issue_title: clean_text(issue.name),
        release_date: parse_date(issue.cover_date.as_deref())
            .or_else(|| parse_date(issue.store_date.as_deref())),
        summary: clean_text(issue.deck).or_else(|| issue.description.as_deref().and_then(strip_html)),
        cover_url: issue
            .image
            .and_then(|img| img.original_url.or(img.super_url).or(img.medium_url))
            .and_then(|url| clean_text(Some(url))),
        web_url: clean_text(issue.site_detail_url),
        credits: build_credits(issue.person_credits.unwrap_or_default()),
        characters: names(issue.character_credits),
        teams: names(issue.team_credits),
        locations: names(issue.location_credits),
        story_arcs: names(issue.story_arc_credits),
        ..Default::default()
    };
    canonical
        .identifiers
        .insert(PROVIDER_NAME.to_string(), issue.id.to_string());
    canonical
}

/// Convert search results, preserving Comic Vine's relevance order.
///
/// Comic Vine reports no score, so confidence decays with rank.
pub fn to_candidates(issues: Vec<dto::Issue>) -> Vec<ProviderCandidate> {
    issues
        .into_iter()
        .enumerate()
        .map(|(rank, issue)| {
            let raw = serde_json::to_value(&issue).ok();
            ProviderCandidate::new(PROVIDER_NAME, to_issue(issue))
                .with_confidence(rank_confidence(rank))
                .with_raw(raw)
        })
        .collect()
}

fn rank_confidence(rank: usize) -> f32 {
    (1.0 - rank as f32 * 0.05).max(0.05)
}

/// One credit per role; roles are separated by commas, tildes or newlines
fn build_credits(people: Vec<dto::PersonCredit>) -> Vec<Credit> {
    let mut credits = Vec::new();
    for person in people {
        let Some(name) = clean_text(Some(person.name)) else {
            continue;
        };
        let roles: Vec<String> = person
            .role
            .as_deref()
            .unwrap_or_default()
            .split([',', '~', '\r', '\n'])
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(title_case)
            .collect();
        if roles.is_empty() {
            credits.push(Credit::new("Other", name));
        } else {
            credits.extend(roles.into_iter().map(|role| Credit::new(role, name.clone())));
        }
    }
    credits
}

fn names(refs: Option<Vec<dto::NamedRef>>) -> Vec<String> {
    clean_list(refs.unwrap_or_default().into_iter().map(|r| r.name))
}

/// Reduce an HTML description to plain text
fn strip_html(html: &str) -> Option<String> {
    let text = HTML_TAG.replace_all(html, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    clean_text(Some(collapsed))
}
