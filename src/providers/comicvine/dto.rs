//! Comic Vine API Data Transfer Objects
//!
//! These types match what the Comic Vine API returns.
//! DO NOT use these types outside the comicvine module - convert to canonical types.
//!
//! API Reference: https://comicvine.gamespot.com/api/documentation
//!
//! Every response is wrapped in an envelope carrying a numeric
//! `status_code`; the `results` payload is an object for detail lookups and
//! an array for searches. Many list fields are `null` instead of `[]`, so
//! they are modelled as `Option<Vec<_>>`.

use serde::{Deserialize, Serialize};

/// Envelope status codes
pub const STATUS_OK: u32 = 1;
pub const STATUS_INVALID_API_KEY: u32 = 100;
pub const STATUS_OBJECT_NOT_FOUND: u32 = 101;
pub const STATUS_FILTER_ERROR: u32 = 104;
pub const STATUS_RATE_LIMITED: u32 = 107;

/// Envelope fields only, used to check the status before decoding `results`
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub error: String,
    pub status_code: u32,
}

/// Full response envelope
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Envelope<T> {
    pub error: String,
    pub status_code: u32,
    pub number_of_total_results: Option<u64>,
    pub results: T,
}

/// Issue record (detail lookups carry credits, search results usually don't)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Issue {
    pub id: u64,
    /// Issue title
    pub name: Option<String>,
    pub issue_number: Option<String>,
    /// Date printed on the cover (YYYY-MM-DD)
    pub cover_date: Option<String>,
    /// Date it went on sale (YYYY-MM-DD)
    pub store_date: Option<String>,
    /// Short plain-text summary
    pub deck: Option<String>,
    /// Long HTML description
    pub description: Option<String>,
    /// Series the issue belongs to
    pub volume: Option<VolumeRef>,
    pub image: Option<Image>,
    pub person_credits: Option<Vec<PersonCredit>>,
    pub character_credits: Option<Vec<NamedRef>>,
    pub team_credits: Option<Vec<NamedRef>>,
    pub location_credits: Option<Vec<NamedRef>>,
    pub story_arc_credits: Option<Vec<NamedRef>>,
    pub site_detail_url: Option<String>,
}

/// Series reference ("volume" in Comic Vine terms)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VolumeRef {
    pub id: u64,
    pub name: Option<String>,
}

/// Cover image URLs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Image {
    pub original_url: Option<String>,
    pub super_url: Option<String>,
    pub medium_url: Option<String>,
}

/// Creator credit; `role` is a comma separated list ("writer, penciler")
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersonCredit {
    pub id: u64,
    pub name: String,
    pub role: Option<String>,
}

/// Generic id + name reference (characters, teams, locations, arcs)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NamedRef {
    pub id: u64,
    pub name: String,
}
