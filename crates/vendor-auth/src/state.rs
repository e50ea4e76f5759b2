//! Credential resolution with single-flight token exchange
//!
//! `AuthState` answers one question before every gated call: which access
//! token goes on the request. It holds the credential behind a tokio `Mutex`
//! for the whole resolution, so at most one exchange is in flight. Callers
//! that queue behind an exchange see its result when they get the lock: a
//! fresh token on success, or the same error on failure, without issuing a
//! second token request. A still-valid token always wins over a shared
//! failure, and only a failure of the grant the waiter would issue itself is
//! shared.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use common::Secret;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::credential::{Credential, TokenDecision, now_millis};
use crate::error::{Error, GrantKind, Result};
use crate::token::{Grant, TokenResponse};

/// Performs token endpoint calls on behalf of `AuthState`.
///
/// The request dispatcher implements this by posting the grant's form to the
/// token endpoint. Uses `Pin<Box<dyn Future>>` so `AuthState` can take it as
/// `&dyn TokenExchanger`.
pub trait TokenExchanger: Send + Sync {
    fn exchange_for_token<'a>(
        &'a self,
        grant: &'a Grant,
    ) -> Pin<Box<dyn Future<Output = Result<TokenResponse>> + Send + 'a>>;
}

/// Failure of an exchange started by `resolve_token`, kept for the callers
/// that queued behind it.
struct SharedFailure {
    /// Value of `AuthState::attempts` once the failed exchange completed.
    generation: u64,
    grant: GrantKind,
    error: Error,
}

struct Inner {
    credential: Credential,
    last_failure: Option<SharedFailure>,
}

/// Owner of the OAuth credential lifecycle for one client.
pub struct AuthState {
    inner: Mutex<Inner>,
    /// Completed exchange attempts. Written only while `inner` is locked.
    attempts: AtomicU64,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new(Credential::new())
    }
}

impl AuthState {
    pub fn new(credential: Credential) -> Self {
        Self {
            inner: Mutex::new(Inner {
                credential,
                last_failure: None,
            }),
            attempts: AtomicU64::new(0),
        }
    }

    /// Clone of the current credential (tokens stay redacted in Debug).
    pub async fn snapshot(&self) -> Credential {
        self.inner.lock().await.credential.clone()
    }

    pub async fn is_authorized(&self) -> bool {
        self.inner.lock().await.credential.is_authorized()
    }

    /// Store a request code from the redirect flow for the next resolution.
    pub async fn set_request_code(&self, code: impl Into<Secret<String>>) {
        let mut inner = self.inner.lock().await;
        inner.credential.set_request_code(code);
        // A new code supersedes whatever the last exchange reported.
        inner.last_failure = None;
        debug!("request code stored");
    }

    /// Drop every token and any pending request code. This is the only way
    /// back to the unauthorized state.
    pub async fn invalidate(&self) {
        let mut inner = self.inner.lock().await;
        inner.credential = Credential::new();
        inner.last_failure = None;
        info!("credential invalidated");
    }

    /// Return a usable access token, exchanging for one if needed.
    ///
    /// Evaluates `Credential::decide` and acts on it: return the cached
    /// token, refresh, exchange the request code, or fail with
    /// `AuthenticationUnavailable` without touching the network.
    pub async fn resolve_token(&self, exchanger: &dyn TokenExchanger) -> Result<Secret<String>> {
        let observed = self.attempts.load(Ordering::Acquire);
        let mut inner = self.inner.lock().await;

        let decision = inner.credential.decide(now_millis());
        debug!(decision = decision.label(), "auth decision");
        metrics::counter!("vendor_auth_decisions_total", "decision" => decision.label())
            .increment(1);

        let kind = match decision {
            TokenDecision::Valid => {
                return inner
                    .credential
                    .access_token()
                    .cloned()
                    .ok_or(Error::AuthenticationUnavailable);
            }
            TokenDecision::Unavailable => {
                warn!("no access token, refresh token, or request code; refusing call");
                return Err(Error::AuthenticationUnavailable);
            }
            TokenDecision::Refresh => GrantKind::RefreshToken,
            TokenDecision::Authorize => GrantKind::AuthorizationCode,
        };

        // A resolution queued ahead of us already tried this grant while we
        // waited. Share its failure instead of repeating it.
        if let Some(failure) = &inner.last_failure
            && failure.generation > observed
            && failure.grant == kind
        {
            debug!(error = %failure.error, "reusing result of concurrent exchange");
            return Err(failure.error.clone());
        }

        let grant = match kind {
            GrantKind::RefreshToken => refresh_grant(&inner.credential)?,
            GrantKind::AuthorizationCode => code_grant(&mut inner.credential)?,
        };
        let result = self.exchange_locked(&mut inner, exchanger, grant).await;
        if let Err(error) = &result {
            inner.last_failure = Some(SharedFailure {
                generation: self.attempts.load(Ordering::Acquire),
                grant: kind,
                error: error.clone(),
            });
        }
        result
    }

    /// Exchange `code` immediately, regardless of current state.
    pub async fn exchange_code(
        &self,
        exchanger: &dyn TokenExchanger,
        code: impl Into<Secret<String>>,
    ) -> Result<Secret<String>> {
        let mut inner = self.inner.lock().await;
        let grant = Grant::AuthorizationCode { code: code.into() };
        self.exchange_locked(&mut inner, exchanger, grant).await
    }

    /// Refresh immediately with the stored refresh token.
    pub async fn refresh(&self, exchanger: &dyn TokenExchanger) -> Result<Secret<String>> {
        let mut inner = self.inner.lock().await;
        let grant = refresh_grant(&inner.credential)?;
        self.exchange_locked(&mut inner, exchanger, grant).await
    }

    /// Store `code` and resolve by priority. An already valid session keeps
    /// its token and the code waits for a later resolution.
    pub async fn authorize(
        &self,
        exchanger: &dyn TokenExchanger,
        code: impl Into<Secret<String>>,
    ) -> Result<Secret<String>> {
        self.set_request_code(code).await;
        self.resolve_token(exchanger).await
    }

    async fn exchange_locked(
        &self,
        inner: &mut Inner,
        exchanger: &dyn TokenExchanger,
        grant: Grant,
    ) -> Result<Secret<String>> {
        let kind = grant.kind();
        debug!(grant = %kind, "starting token exchange");

        inner.last_failure = None;
        let result = exchanger.exchange_for_token(&grant).await;
        let outcome = match result {
            Ok(token) => {
                inner.credential.apply(&token, now_millis());
                info!(grant = %kind, expires_in = token.expires_in, "token exchange succeeded");
                Ok(Secret::new(token.access_token))
            }
            Err(err) => {
                warn!(grant = %kind, error = %err, "token exchange failed");
                Err(err)
            }
        };
        metrics::counter!(
            "vendor_token_exchanges_total",
            "grant" => kind.as_str(),
            "outcome" => if outcome.is_ok() { "success" } else { "failure" }
        )
        .increment(1);

        self.attempts.fetch_add(1, Ordering::Release);
        outcome
    }
}

fn refresh_grant(credential: &Credential) -> Result<Grant> {
    credential
        .refresh_token()
        .cloned()
        .map(|refresh_token| Grant::RefreshToken { refresh_token })
        .ok_or(Error::AuthenticationUnavailable)
}

/// Takes the request code out of the credential before the exchange is
/// issued. A code is never submitted twice, even when the first attempt
/// fails in transit.
fn code_grant(credential: &mut Credential) -> Result<Grant> {
    credential
        .take_request_code()
        .map(|code| Grant::AuthorizationCode { code })
        .ok_or(Error::AuthenticationUnavailable)
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("attempts", &self.attempts.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
