//! HTTP adapter for the chat transport (C5). See spec §4.3, §6.
//!
//! Shaped like [`guard_school::Client`] (bearer-header builder,
//! `exec_request`/`decode_json` pair); the request/response DTOs follow the
//! same pairing style as `login`'s device-code exchange.

mod client;
mod dto;
mod error;

pub use client::Client;
pub use error::ChatApiError;
