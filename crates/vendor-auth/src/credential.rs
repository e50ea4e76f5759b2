//! In-memory OAuth credential and the token decision table
//!
//! `expires_at` is a unix timestamp in milliseconds (absolute, not a delta).
//! A token is usable strictly before that instant. Nothing here is persisted:
//! the credential lives as long as the owning client.

use common::Secret;
use tracing::debug;

use crate::token::TokenResponse;

/// What `resolve_token` has to do to produce a usable access token.
///
/// Variants are listed in evaluation priority. Refresh outranks authorize so
/// that an expired session never burns a one-time request code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenDecision {
    /// Authorized and unexpired, use the current access token
    Valid,
    /// Expired, or never authorized but holding a refresh token
    Refresh,
    /// No refresh token but a request code is waiting to be exchanged
    Authorize,
    /// Nothing to work with
    Unavailable,
}

impl TokenDecision {
    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            TokenDecision::Valid => "valid",
            TokenDecision::Refresh => "refresh",
            TokenDecision::Authorize => "authorize",
            TokenDecision::Unavailable => "unavailable",
        }
    }
}

/// OAuth state for one client instance.
///
/// Invariant: `authorized` implies both tokens are present and non-empty.
/// Only `apply` sets `authorized`, and it only does so with both in hand.
#[derive(Debug, Clone, Default)]
pub struct Credential {
    access_token: Option<Secret<String>>,
    refresh_token: Option<Secret<String>>,
    expires_at: u64,
    authorized: bool,
    request_code: Option<Secret<String>>,
}

impl Credential {
    /// Empty, unauthorized credential.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unauthorized credential holding only a refresh token. The first gated
    /// call refreshes it.
    pub fn with_refresh_token(refresh_token: impl Into<Secret<String>>) -> Self {
        Self {
            refresh_token: non_empty(refresh_token.into()),
            ..Self::default()
        }
    }

    /// Authorized credential restored from a previously issued token pair.
    ///
    /// Falls back to `with_refresh_token` semantics when the access token is
    /// empty, and to an empty credential when the refresh token is.
    pub fn with_tokens(
        access_token: impl Into<Secret<String>>,
        refresh_token: impl Into<Secret<String>>,
        expires_at: u64,
    ) -> Self {
        let access_token = non_empty(access_token.into());
        let refresh_token = non_empty(refresh_token.into());
        let authorized = access_token.is_some() && refresh_token.is_some();
        Self {
            access_token: if authorized { access_token } else { None },
            refresh_token,
            expires_at: if authorized { expires_at } else { 0 },
            authorized,
            request_code: None,
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    pub fn access_token(&self) -> Option<&Secret<String>> {
        self.access_token.as_ref()
    }

    pub fn refresh_token(&self) -> Option<&Secret<String>> {
        self.refresh_token.as_ref()
    }

    /// Expiry in unix milliseconds. Only meaningful while authorized.
    pub fn expires_at(&self) -> Option<u64> {
        self.authorized.then_some(self.expires_at)
    }

    pub fn has_request_code(&self) -> bool {
        self.request_code.is_some()
    }

    /// Store a request code obtained out-of-band (redirect callback).
    /// Replaces any code not yet exchanged.
    pub fn set_request_code(&mut self, code: impl Into<Secret<String>>) {
        self.request_code = non_empty(code.into());
    }

    /// Remove the request code so it can't be submitted again.
    pub(crate) fn take_request_code(&mut self) -> Option<Secret<String>> {
        self.request_code.take()
    }

    /// Evaluate the decision table at `now_millis`.
    pub fn decide(&self, now_millis: u64) -> TokenDecision {
        if self.authorized {
            if now_millis < self.expires_at {
                TokenDecision::Valid
            } else {
                TokenDecision::Refresh
            }
        } else if self.refresh_token.is_some() {
            TokenDecision::Refresh
        } else if self.request_code.is_some() {
            TokenDecision::Authorize
        } else {
            TokenDecision::Unavailable
        }
    }

    /// Record a successful exchange. A response without a refresh token keeps
    /// the one already held.
    pub(crate) fn apply(&mut self, token: &TokenResponse, now_millis: u64) {
        self.access_token = Some(Secret::new(token.access_token.clone()));
        if let Some(refresh) = token.refresh_token.as_ref().filter(|r| !r.is_empty()) {
            self.refresh_token = Some(Secret::new(refresh.clone()));
        }
        self.expires_at = token.expires_at(now_millis);
        self.authorized = self.refresh_token.is_some();
        debug!(
            expires_at = self.expires_at,
            authorized = self.authorized,
            "credential updated"
        );
    }
}

/// Current time as unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn non_empty(secret: Secret<String>) -> Option<Secret<String>> {
    (!secret.is_empty()).then_some(secret)
}
