//! Read-only client for the APS Data Management and user-profile APIs
//!
//! Thin bearer-authenticated GET wrappers over the hubs/projects/folders/
//! items endpoints. Responses are deliberately not remodeled: the JSON:API
//! `data` arrays pass through as `serde_json::Value` so the browser sees
//! exactly what the provider sent. Non-2xx responses surface as
//! `Error::Upstream` carrying the provider's status and body verbatim.

mod client;
mod error;

pub use client::DataClient;
pub use error::{Error, Result};
