//! Browser-facing authorization URL
//!
//! The user opens this URL, signs in with the vendor, and is redirected to
//! `redirect_uri` with a one-time `code` query parameter. That code is what
//! `AuthState::set_request_code` expects.

use reqwest::Url;

use crate::constants::AUTHORIZE_PATH;
use crate::error::{Error, Result};

/// Build the authorization URL for `base_url`.
///
/// Pure: no network call, no credential access. All parameter values are
/// percent-encoded.
pub fn build_authorization_url(
    base_url: &str,
    client_id: &str,
    redirect_uri: &str,
    response_type: &str,
) -> Result<String> {
    let endpoint = format!("{}{}", base_url.trim_end_matches('/'), AUTHORIZE_PATH);
    let url = Url::parse_with_params(
        &endpoint,
        &[
            ("response_type", response_type),
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
        ],
    )
    .map_err(|e| Error::InvalidUrl(format!("{endpoint}: {e}")))?;
    Ok(url.into())
}
