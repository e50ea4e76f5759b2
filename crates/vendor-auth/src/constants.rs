//! Vendor OAuth endpoint paths and fixed grant parameters
//!
//! Paths are relative to the environment's base URL. The token endpoint sits
//! at the host root, outside the versioned API prefix, and is the only path
//! that is reachable without a bearer token.

/// Token endpoint for code exchange and token refresh
pub const TOKEN_PATH: &str = "/oauth/token";

/// Browser-facing authorization endpoint
pub const AUTHORIZE_PATH: &str = "/oauth/authorize";

/// Default `response_type` for the authorization URL
pub const DEFAULT_RESPONSE_TYPE: &str = "code";

/// Sent with every authorization-code grant. The vendor re-prompts for a
/// login when this is anything other than `0`.
pub const FORCE_LOGIN: &str = "0";
