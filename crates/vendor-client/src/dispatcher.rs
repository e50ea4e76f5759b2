//! Request dispatch with the auth gate
//!
//! `send` turns a logical call into an HTTP request. Every endpoint except the
//! token endpoint is gated: the dispatcher asks `AuthState` for a token first
//! and only then builds the request, so a resource call never starts before
//! token resolution has finished. Token exchanges themselves go through
//! `send` too, ungated, via the `TokenExchanger` impl below.

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use common::Secret;
use reqwest::Method;
use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderValue};
use tracing::{debug, instrument, warn};
use vendor_auth::{
    AuthState, ClientCredentials, Credential, ExchangeFailure, Grant, TOKEN_PATH, TokenExchanger,
    TokenResponse,
};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::metrics;
use crate::response::{Payload, Response};

/// Prefix for every resource path. The token endpoint lives outside it.
pub const API_PREFIX: &str = "/api/v1";

/// Correlation header attached to every outgoing call
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Whether `endpoint` needs a bearer token. Only the token endpoint is exempt.
pub fn requires_authorization(endpoint: &str) -> bool {
    endpoint != TOKEN_PATH
}

/// Builds, gates, and issues calls against the vendor API.
pub struct RequestDispatcher {
    http: reqwest::Client,
    base_url: String,
    credentials: ClientCredentials,
    auth: AuthState,
    debug: bool,
}

impl RequestDispatcher {
    /// Dispatcher with an empty, unauthorized credential.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Self::with_credential(config, Credential::new())
    }

    /// Dispatcher seeded with an existing credential (a stored refresh token,
    /// or a token pair from an earlier session).
    pub fn with_credential(config: &ClientConfig, credential: Credential) -> Result<Self> {
        config.validate()?;
        let credentials = config.client_credentials()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Transport(format!("building HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            credentials,
            auth: AuthState::new(credential),
            debug: config.debug,
        })
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    /// Issue one call.
    ///
    /// `query` is appended URL-encoded when non-empty. `body` is sent
    /// form-encoded and is required for POST. Gated endpoints fail with
    /// `Error::Auth` before any network activity when no token can be had.
    #[instrument(skip_all, fields(endpoint = %endpoint, method = %method))]
    pub async fn send(
        &self,
        endpoint: &str,
        method: Method,
        query: &[(&str, &str)],
        body: Option<&[(&str, &str)]>,
    ) -> Result<Response> {
        if method != Method::GET && method != Method::POST {
            return Err(Error::InvalidRequest(format!(
                "unsupported method {method}, expected GET or POST"
            )));
        }
        if method == Method::POST && body.is_none() {
            return Err(Error::InvalidRequest(format!(
                "POST {endpoint} requires a body"
            )));
        }

        let token = if requires_authorization(endpoint) {
            Some(self.auth.resolve_token(self).await.inspect_err(|e| {
                warn!(error = %e, "auth gate refused call");
            })?)
        } else {
            None
        };

        self.dispatch(endpoint, method, query, body, token.as_ref())
            .await
    }

    async fn dispatch(
        &self,
        endpoint: &str,
        method: Method,
        query: &[(&str, &str)],
        body: Option<&[(&str, &str)]>,
        token: Option<&Secret<String>>,
    ) -> Result<Response> {
        let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
        let url = self.endpoint_url(endpoint);
        debug!(%request_id, %url, authorized = token.is_some(), "dispatching");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
            .header(REQUEST_ID_HEADER, request_id.as_str());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(form) = body {
            // Sets Content-Type: application/x-www-form-urlencoded; the
            // encoded bytes give an exact Content-Length.
            request = request.form(form);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token.expose());
        }

        let started = Instant::now();
        let response = request.send().await.map_err(|e| {
            metrics::record_transport_error(e.is_timeout());
            warn!(%request_id, error = %e, "request failed");
            Error::transport(e)
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            metrics::record_transport_error(e.is_timeout());
            Error::transport(e)
        })?;
        metrics::record_request(
            method.as_str(),
            status.as_u16(),
            !requires_authorization(endpoint),
            started.elapsed().as_secs_f64(),
        );

        let payload = Payload::from_bytes(body.to_vec());
        if !payload.is_json() {
            debug!(%request_id, status = status.as_u16(), "response body is not JSON, returning raw text");
        }
        debug!(%request_id, status = status.as_u16(), "response received");

        Ok(Response { status, payload })
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        let path = if endpoint.starts_with('/') {
            endpoint.to_string()
        } else {
            format!("/{endpoint}")
        };
        if requires_authorization(&path) {
            format!("{}{}{}", self.base_url, API_PREFIX, path)
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    async fn post_grant(&self, grant: &Grant) -> vendor_auth::Result<TokenResponse> {
        let kind = grant.kind();
        let fields = grant.form_fields(&self.credentials);
        let form: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let response = self
            .send(TOKEN_PATH, Method::POST, &[], Some(&form))
            .await
            .map_err(|e| vendor_auth::Error::exchange(kind, e.into_exchange_failure()))?;

        if self.debug {
            debug!(
                grant = %kind,
                status = response.status.as_u16(),
                body = %response.payload.to_text(),
                "raw token endpoint response"
            );
        }

        if !response.is_success() {
            return Err(vendor_auth::Error::exchange(
                kind,
                ExchangeFailure::Rejected {
                    status: response.status.as_u16(),
                    body: response.payload.to_text(),
                },
            ));
        }

        match response.payload {
            Payload::Json(value) => TokenResponse::from_json(value, kind),
            Payload::Raw(text) => Err(vendor_auth::Error::exchange(
                kind,
                ExchangeFailure::Malformed(format!("token endpoint returned non-JSON body: {text}")),
            )),
        }
    }
}

impl TokenExchanger for RequestDispatcher {
    fn exchange_for_token<'a>(
        &'a self,
        grant: &'a Grant,
    ) -> Pin<Box<dyn Future<Output = vendor_auth::Result<TokenResponse>> + Send + 'a>> {
        Box::pin(self.post_grant(grant))
    }
}

impl std::fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("base_url", &self.base_url)
            .field("client_id", &self.credentials.client_id)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}
