//! Search hints from archive file names.
//!
//! Handles the common scene/library naming styles:
//! `Example_Comic_v2_#001_(2020).cbz`, `Example Comic 012 (2021) (digital).cbr`,
//! `Example Comic - 003 - Title.cbz`.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::normalize_issue_number;
use crate::providers::SearchHint;

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\(\[]((?:19|20)\d{2})[\)\]]").expect("valid year pattern"));

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\(\[][^\)\]]*[\)\]]").expect("valid bracket pattern"));

static VOLUME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bv(?:ol(?:ume)?\.?\s*)?(\d{1,4})\b").expect("valid volume pattern")
});

static ISSUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#?(\d+(?:\.\d+)?[a-zA-Z]?)$").expect("valid issue pattern"));

/// Parse a search hint from a path's file stem.
pub fn parse(path: &Path) -> SearchHint {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .replace('_', " ");
    parse_name(&stem)
}

/// Parse a search hint from a bare name (no extension).
pub fn parse_name(name: &str) -> SearchHint {
    let year = YEAR
        .captures_iter(name)
        .last()
        .and_then(|c| c[1].parse::<i32>().ok());

    let without_groups = BRACKETED.replace_all(name, " ");

    let volume = VOLUME
        .captures(&without_groups)
        .and_then(|c| c[1].parse::<u32>().ok())
        .filter(|v| *v > 0);
    let remaining = VOLUME.replace(&without_groups, " ");

    let tokens: Vec<&str> = remaining.split_whitespace().collect();
    let issue_index = tokens
        .iter()
        .position(|t| t.starts_with('#') && ISSUE.is_match(t))
        .or_else(|| {
            tokens
                .iter()
                .enumerate()
                .skip(1)
                .find(|(_, t)| ISSUE.is_match(t))
                .map(|(i, _)| i)
        });

    let (series_tokens, issue_number) = match issue_index {
        Some(i) => {
            let number = ISSUE
                .captures(tokens[i])
                .map(|c| normalize_issue_number(&c[1]));
            (&tokens[..i], number)
        }
        None => (&tokens[..], None),
    };

    let series = series_tokens
        .join(" ")
        .trim_matches(|c: char| c == '-' || c == ',' || c.is_whitespace())
        .to_string();

    SearchHint {
        series: (!series.is_empty()).then_some(series),
        issue_number,
        year,
        volume,
    }
}
