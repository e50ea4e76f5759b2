//! Error types for dispatched API calls

/// Errors from `RequestDispatcher` operations.
///
/// Authentication failures keep their `vendor_auth::Error` shape so callers
/// can tell "supply a new request code" apart from a failed exchange.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] vendor_auth::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Config(#[from] common::Error),
}

impl Error {
    /// Whether the caller may retry the same call unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Auth(e) => e.is_retryable(),
            Error::InvalidRequest(_) | Error::Config(_) => false,
        }
    }

    /// True when the call was refused because no token could be obtained.
    pub fn is_authentication_unavailable(&self) -> bool {
        matches!(self, Error::Auth(vendor_auth::Error::AuthenticationUnavailable))
    }

    /// Cause of a failed token endpoint call. Only transport errors stay
    /// retryable; anything else means the exchange cannot succeed as issued.
    pub(crate) fn into_exchange_failure(self) -> vendor_auth::ExchangeFailure {
        use vendor_auth::ExchangeFailure;
        match self {
            Error::Transport(msg) => ExchangeFailure::Transport(msg),
            Error::Auth(e) => ExchangeFailure::Malformed(e.to_string()),
            Error::InvalidRequest(msg) => ExchangeFailure::Malformed(msg),
            Error::Config(e) => ExchangeFailure::Malformed(e.to_string()),
        }
    }

    pub(crate) fn transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Transport(format!("request timed out: {e}"))
        } else {
            Error::Transport(e.to_string())
        }
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
