//! HTTP adapter for the school's booking API (C4). See spec §4.4, §6.
//!
//! Mirrors the upstream backend client: one [`Client`] holding a
//! `reqwest::Client` plus a bearer token, one public async method per
//! logical endpoint, and a shared `exec_request`/`decode_json` pair so every
//! endpoint maps transport failures onto [`guard_protocol::ErrorKind`] the
//! same way.

mod client;
mod dto;
mod error;

pub use client::Client;
pub use dto::CalendarEvent;
pub use dto::Notification;
pub use dto::ProjectGraph;
pub use error::SchoolApiError;
