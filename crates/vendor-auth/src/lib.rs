//! OAuth credential lifecycle for the vendor REST API
//!
//! Owns the access token, refresh token, expiry, and pending request code for
//! one client, and decides before every gated call how a usable token is
//! obtained. This crate never talks HTTP itself: exchanges go through a
//! `TokenExchanger`, which the request dispatcher implements.
//!
//! Credential flow:
//! 1. User authorizes via `build_authorization_url()` and returns with a code
//! 2. Caller stores it with `AuthState::set_request_code()`
//! 3. First gated call: `AuthState::resolve_token()` exchanges the code
//! 4. Later calls reuse the token until it expires, then refresh it
//! 5. `AuthState::invalidate()` drops everything

pub mod authorize;
pub mod constants;
pub mod credential;
pub mod error;
pub mod state;
pub mod token;

pub use authorize::build_authorization_url;
pub use constants::*;
pub use credential::{Credential, TokenDecision, now_millis};
pub use error::{Error, ExchangeFailure, GrantKind, Result};
pub use state::{AuthState, TokenExchanger};
pub use token::{ClientCredentials, Grant, TokenResponse};
