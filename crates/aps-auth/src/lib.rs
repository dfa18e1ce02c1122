//! APS three-legged OAuth authentication library
//!
//! Brokers the Autodesk Platform Services authorization-code flow into a
//! pair of bearer tokens: a broad-scope "internal" token the backend uses
//! for Data Management reads, and a restricted-scope "public" token that is
//! safe to hand to client-side viewer code. Both derive from a single user
//! consent; the public token is minted by replaying the refresh token under
//! the narrower scope. This crate is a standalone library with no dependency
//! on the service binary.
//!
//! Credential flow:
//! 1. Service redirects the browser to `AuthClient::authorization_url()`
//! 2. Provider calls back with a single-use authorization code
//! 3. Service calls `AuthClient::exchange_code()` to obtain `Credentials`
//! 4. Expired credentials are replaced wholesale via `AuthClient::refresh()`

pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod token;

pub use config::AuthConfig;
pub use constants::*;
pub use credentials::{Credentials, now_millis};
pub use error::{Error, Result};
pub use token::{AuthClient, TokenResponse};
