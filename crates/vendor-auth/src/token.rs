//! Token endpoint request bodies and response parsing
//!
//! Both grants POST a form to `TOKEN_PATH`:
//! 1. `authorization_code` trades the one-time request code for a token pair
//! 2. `refresh_token` trades the stored refresh token for a new access token
//!
//! The HTTP call itself is made by whoever implements `TokenExchanger`; this
//! module only knows what goes into the form and what must come back.

use std::fmt;

use common::Secret;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::constants::FORCE_LOGIN;
use crate::error::{Error, ExchangeFailure, GrantKind, Result};

/// Read-only client registration used to build token requests.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
}

/// What is being traded at the token endpoint.
#[derive(Debug, Clone)]
pub enum Grant {
    AuthorizationCode { code: Secret<String> },
    RefreshToken { refresh_token: Secret<String> },
}

impl Grant {
    pub fn kind(&self) -> GrantKind {
        match self {
            Grant::AuthorizationCode { .. } => GrantKind::AuthorizationCode,
            Grant::RefreshToken { .. } => GrantKind::RefreshToken,
        }
    }

    /// Form fields for the token endpoint body, in wire order.
    pub fn form_fields(&self, client: &ClientCredentials) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("grant_type", self.kind().as_str().to_string()),
            ("client_id", client.client_id.clone()),
            ("client_secret", client.client_secret.expose().clone()),
        ];
        match self {
            Grant::AuthorizationCode { code } => {
                fields.push(("code", code.expose().clone()));
                fields.push(("redirect_uri", client.redirect_uri.clone()));
                fields.push(("force_login", FORCE_LOGIN.to_string()));
            }
            Grant::RefreshToken { refresh_token } => {
                fields.push(("refresh_token", refresh_token.expose().clone()));
            }
        }
        fields
    }
}

/// Response from the token endpoint for both grants.
///
/// `expires_in` is a delta in seconds; the vendor sends it as either a JSON
/// number or a numeric string. Fields this crate doesn't model are kept in
/// `extra` untouched.
#[derive(Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(deserialize_with = "seconds_from_number_or_string")]
    pub expires_in: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenResponse {
    /// Parse and validate a token endpoint JSON body for the given grant.
    ///
    /// An authorization-code response must carry a refresh token. A refresh
    /// response may omit it, in which case the caller keeps the old one.
    pub fn from_json(value: Value, grant: GrantKind) -> Result<Self> {
        let malformed = |msg: String| Error::exchange(grant, ExchangeFailure::Malformed(msg));

        if !value.is_object() {
            return Err(malformed(format!("expected a JSON object, got {value}")));
        }

        let mut token: TokenResponse =
            serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;

        if token.access_token.is_empty() {
            return Err(malformed("empty access_token".into()));
        }
        if token.refresh_token.as_deref() == Some("") {
            token.refresh_token = None;
        }
        if grant == GrantKind::AuthorizationCode && token.refresh_token.is_none() {
            return Err(malformed(
                "authorization_code response has no refresh_token".into(),
            ));
        }
        Ok(token)
    }

    /// Absolute expiry in unix milliseconds, given the time the response was
    /// received.
    pub fn expires_at(&self, now_millis: u64) -> u64 {
        now_millis.saturating_add(self.expires_in.saturating_mul(1000))
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in", &self.expires_in)
            .field("extra", &self.extra)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Seconds {
    Number(u64),
    Text(String),
}

fn seconds_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Seconds::deserialize(deserializer)? {
        Seconds::Number(n) => Ok(n),
        Seconds::Text(s) => s
            .trim()
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("expires_in {s:?}: {e}"))),
    }
}
