//! Named operations built on `RequestDispatcher::send`

use common::Secret;
use reqwest::Method;
use vendor_auth::DEFAULT_RESPONSE_TYPE;

use crate::dispatcher::RequestDispatcher;
use crate::error::Result;
use crate::response::Response;

/// Resource path of the signed-in user
pub const CURRENT_USER_PATH: &str = "/users/me";

impl RequestDispatcher {
    /// Browser URL that starts the authorization flow. Pure: no network, no
    /// auth gate.
    pub fn build_authorization_url(
        &self,
        redirect_uri: &str,
        response_type: Option<&str>,
    ) -> Result<String> {
        Ok(vendor_auth::build_authorization_url(
            self.base_url(),
            &self.credentials().client_id,
            redirect_uri,
            response_type.unwrap_or(DEFAULT_RESPONSE_TYPE),
        )?)
    }

    /// Authorization URL for the configured redirect URI.
    pub fn default_authorization_url(&self) -> Result<String> {
        let redirect_uri = self.credentials().redirect_uri.clone();
        self.build_authorization_url(&redirect_uri, None)
    }

    /// Store a request code for the next gated call to exchange.
    pub async fn set_request_code(&self, code: impl Into<Secret<String>>) {
        self.auth().set_request_code(code).await;
    }

    /// Exchange an authorization code now and return the new access token.
    pub async fn exchange_token(&self, code: impl Into<Secret<String>>) -> Result<Secret<String>> {
        Ok(self.auth().exchange_code(self, code).await?)
    }

    /// Refresh now with the stored refresh token.
    pub async fn refresh_token(&self) -> Result<Secret<String>> {
        Ok(self.auth().refresh(self).await?)
    }

    /// Store `code` and resolve a token by the usual priority.
    pub async fn authorize(&self, code: impl Into<Secret<String>>) -> Result<Secret<String>> {
        Ok(self.auth().authorize(self, code).await?)
    }

    /// Gated GET with optional query parameters.
    pub async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Response> {
        self.send(endpoint, Method::GET, query, None).await
    }

    /// Gated form POST.
    pub async fn post(&self, endpoint: &str, body: &[(&str, &str)]) -> Result<Response> {
        self.send(endpoint, Method::POST, &[], Some(body)).await
    }

    /// The signed-in user's profile.
    pub async fn get_current_user(&self) -> Result<Response> {
        self.get(CURRENT_USER_PATH, &[]).await
    }
}
