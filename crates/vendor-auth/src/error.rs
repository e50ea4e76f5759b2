//! Error types for OAuth credential resolution

use std::fmt;

/// Which grant a token endpoint call was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantKind {
    AuthorizationCode,
    RefreshToken,
}

impl GrantKind {
    /// Wire value for the `grant_type` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantKind::AuthorizationCode => "authorization_code",
            GrantKind::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for GrantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a token endpoint exchange did not produce a token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeFailure {
    /// Connection failure or timeout talking to the token endpoint
    #[error("transport error: {0}")]
    Transport(String),

    /// The token endpoint answered with a non-success status (bad or reused
    /// code, revoked refresh token, bad client credentials)
    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The response was not a usable token object
    #[error("malformed token response: {0}")]
    Malformed(String),
}

/// Errors from credential resolution and token exchange.
///
/// `Clone` so that callers coalesced onto one exchange can all receive the
/// same failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(
        "authentication unavailable: no access token, no refresh token, and no request code; \
         supply a new request code to authorize"
    )]
    AuthenticationUnavailable,

    #[error("{grant} exchange failed: {cause}")]
    TokenExchangeFailed {
        grant: GrantKind,
        cause: ExchangeFailure,
    },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    pub fn exchange(grant: GrantKind, cause: ExchangeFailure) -> Self {
        Error::TokenExchangeFailed { grant, cause }
    }

    /// Whether retrying the same call could succeed without caller action.
    ///
    /// Only transport-level exchange failures qualify. A rejected grant needs
    /// a new request code or refresh token.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::TokenExchangeFailed {
                cause: ExchangeFailure::Transport(_),
                ..
            }
        )
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
