//! Metron API integration
//!
//! Structured issue search (series name, number, cover year) and full
//! issue lookups. Metron records also carry the Comic Vine id, which
//! lets the two providers corroborate each other.
//!
//! API docs: https://metron.cloud/api/

pub mod dto;
mod adapter;
mod client;

pub use adapter::{PROVIDER_NAME, to_candidates, to_issue};
pub use client::MetronClient;
