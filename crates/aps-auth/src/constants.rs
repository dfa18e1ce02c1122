//! APS OAuth endpoint and scope constants
//!
//! Endpoint paths are relative to the configurable base URL so tests can
//! point the client at a local mock. The defaults target the production
//! Autodesk Platform Services hosts.

/// Default base URL for the APS authentication service
pub const DEFAULT_AUTH_BASE_URL: &str = "https://developer.api.autodesk.com";

/// Authorization (consent) endpoint path, relative to the auth base URL
pub const AUTHORIZE_PATH: &str = "/authentication/v2/authorize";

/// Token endpoint path for code exchange and refresh, relative to the auth base URL
pub const TOKEN_PATH: &str = "/authentication/v2/token";

/// Broad scope for the internal token: server-side Data Management reads
pub const INTERNAL_SCOPE: &str = "data:read";

/// Restricted scope for the public token: viewer-only access, safe to ship
/// to the browser
pub const PUBLIC_SCOPE: &str = "viewables:read";
