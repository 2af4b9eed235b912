//! Metron API Data Transfer Objects
//!
//! These types match what the Metron API returns.
//! DO NOT use these types outside the metron module - convert to canonical types.
//!
//! API Reference: https://metron.cloud/api/

use serde::{Deserialize, Serialize};

/// Paginated list response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Issue entry in a search result
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IssueListItem {
    pub id: u64,
    pub series: SeriesSummary,
    pub number: Option<String>,
    /// Display string ("Example Comic (2020) #1")
    pub issue: Option<String>,
    pub cover_date: Option<String>,
    pub image: Option<String>,
}

/// Series as embedded in a search result
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeriesSummary {
    pub name: String,
    pub volume: Option<u32>,
    pub year_began: Option<i32>,
}

/// Full issue record
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Issue {
    pub id: u64,
    pub publisher: Option<NamedRef>,
    pub series: Series,
    pub number: Option<String>,
    /// Collection title (trades, graphic novels)
    pub title: Option<String>,
    /// Story titles
    #[serde(default)]
    pub name: Vec<String>,
    pub cover_date: Option<String>,
    pub store_date: Option<String>,
    pub rating: Option<NamedRef>,
    pub desc: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub arcs: Vec<NamedRef>,
    #[serde(default)]
    pub credits: Vec<CreditEntry>,
    #[serde(default)]
    pub characters: Vec<NamedRef>,
    #[serde(default)]
    pub teams: Vec<NamedRef>,
    pub resource_url: Option<String>,
    /// Cross reference to Comic Vine
    pub cv_id: Option<u64>,
}

/// Series as embedded in a full issue record
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Series {
    pub id: u64,
    pub name: String,
    pub volume: Option<u32>,
    pub year_began: Option<i32>,
    pub series_type: Option<SeriesType>,
    #[serde(default)]
    pub genres: Vec<NamedRef>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeriesType {
    pub name: String,
}

/// Generic id + name reference
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NamedRef {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
}

/// One creator with all their roles on the issue
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreditEntry {
    pub creator: String,
    #[serde(default)]
    pub role: Vec<NamedRef>,
}
