//! Adapter layer: Convert Metron DTOs to canonical records
//!
//! This is the ONLY place where Metron DTO types are converted to
//! canonical types.

use chrono::Datelike;

use super::dto;
use crate::model::{
    normalize_issue_number, CanonicalIssue, Credit, IssueFormat, IssueNumber, ProviderCandidate,
};
use crate::providers::domain::{clean_list, clean_text, parse_date, SearchHint};

/// Name used for precedence, provenance and identifiers
pub const PROVIDER_NAME: &str = "metron";

/// Convert a full issue record into a canonical issue
pub fn to_issue(issue: dto::Issue) -> CanonicalIssue {
    let series = issue.series;
    let issue_title = clean_text(issue.title).or_else(|| clean_list(issue.name).into_iter().next());

    let mut canonical = CanonicalIssue {
        series_title: clean_text(Some(series.name)),
        series_volume: series.volume.filter(|v| *v > 0),
        issue_number: IssueNumber::from_provider(issue.number.as_deref()),
        issue_title,
        release_date: parse_date(issue.cover_date.as_deref())
            .or_else(|| parse_date(issue.store_date.as_deref())),
        summary: clean_text(issue.desc),
        publisher: issue.publisher.and_then(|p| clean_text(Some(p.name))),
        format: series
            .series_type
            .and_then(|t| IssueFormat::parse(&t.name)),
        rating: issue
            .rating
            .and_then(|r| clean_text(Some(r.name)))
            .filter(|r| !r.eq_ignore_ascii_case("unknown")),
        cover_url: clean_text(issue.image),
        web_url: clean_text(issue.resource_url),
        credits: build_credits(issue.credits),
        genres: names(series.genres),
        characters: names(issue.characters),
        teams: names(issue.teams),
        story_arcs: names(issue.arcs),
        ..Default::default()
    };

    canonical
        .identifiers
        .insert(PROVIDER_NAME.to_string(), issue.id.to_string());
    if let Some(cv_id) = issue.cv_id {
        canonical
            .identifiers
            .insert("comicvine".to_string(), cv_id.to_string());
    }
    canonical
}

/// Convert search results into candidates.
///
/// Metron filters server-side, so confidence reflects how well each result
/// agrees with the hint on issue number and year.
pub fn to_candidates(items: Vec<dto::IssueListItem>, hint: &SearchHint) -> Vec<ProviderCandidate> {
    items
        .into_iter()
        .map(|item| {
            let confidence = agreement(&item, hint);
            let raw = serde_json::to_value(&item).ok();
            ProviderCandidate::new(PROVIDER_NAME, list_item_to_issue(item))
                .with_confidence(confidence)
                .with_raw(raw)
        })
        .collect()
}

fn list_item_to_issue(item: dto::IssueListItem) -> CanonicalIssue {
    let mut issue = CanonicalIssue {
        series_title: clean_text(Some(item.series.name)),
        series_volume: item.series.volume.filter(|v| *v > 0),
        issue_number: IssueNumber::from_provider(item.number.as_deref()),
        release_date: parse_date(item.cover_date.as_deref()),
        cover_url: clean_text(item.image),
        ..Default::default()
    };
    issue
        .identifiers
        .insert(PROVIDER_NAME.to_string(), item.id.to_string());
    issue
}

fn agreement(item: &dto::IssueListItem, hint: &SearchHint) -> f32 {
    let mut confidence: f32 = 0.7;
    if let (Some(wanted), Some(number)) = (hint.issue_number.as_deref(), item.number.as_deref())
        && normalize_issue_number(wanted) == normalize_issue_number(number)
    {
        confidence += 0.2;
    }
    let year = parse_date(item.cover_date.as_deref())
        .map(|d| d.year())
        .or(item.series.year_began);
    if let (Some(wanted), Some(year)) = (hint.year, year)
        && wanted == year
    {
        confidence += 0.1;
    }
    confidence.min(1.0)
}

/// One credit per role
fn build_credits(entries: Vec<dto::CreditEntry>) -> Vec<Credit> {
    let mut credits = Vec::new();
    for entry in entries {
        let Some(name) = clean_text(Some(entry.creator)) else {
            continue;
        };
        let roles = clean_list(entry.role.into_iter().map(|r| r.name));
        if roles.is_empty() {
            credits.push(Credit::new("Other", name));
        } else {
            credits.extend(roles.into_iter().map(|role| Credit::new(role, name.clone())));
        }
    }
    credits
}

fn names(refs: Vec<dto::NamedRef>) -> Vec<String> {
    clean_list(refs.into_iter().map(|r| r.name))
}
