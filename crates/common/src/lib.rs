//! Shared types for the hubs-browser workspace

mod secret;
mod error;

pub use secret::Secret;
pub use error::{Error, Result};
