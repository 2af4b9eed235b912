//! Comic Vine API integration
//!
//! Keyword search over issues plus full issue lookups by Comic Vine id.
//!
//! API docs: https://comicvine.gamespot.com/api/documentation

pub mod dto;
mod adapter;
mod client;

pub use adapter::{PROVIDER_NAME, to_candidates, to_issue};
pub use client::ComicVineClient;
