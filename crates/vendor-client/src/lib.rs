//! Client for the vendor REST API
//!
//! `RequestDispatcher` builds every outbound call and runs it through the auth
//! gate backed by `vendor_auth::AuthState`: a cached token is attached when
//! valid, otherwise it is refreshed or obtained from a pending request code,
//! and calls with no path to a token are refused before touching the network.
//!
//! ```no_run
//! # async fn demo() -> vendor_client::Result<()> {
//! use vendor_client::{ClientConfig, Payload, RequestDispatcher};
//!
//! let config = ClientConfig::new("client-id", "client-secret", "https://app.example.com/cb");
//! let client = RequestDispatcher::new(&config)?;
//! println!("open {}", client.default_authorization_url()?);
//!
//! client.set_request_code("code-from-redirect").await;
//! match client.get_current_user().await?.payload {
//!     Payload::Json(user) => println!("{}", user["name"]),
//!     Payload::Raw(text) => eprintln!("unexpected body: {text}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod response;

pub use api::CURRENT_USER_PATH;
pub use config::{ClientConfig, Environment};
pub use dispatcher::{API_PREFIX, RequestDispatcher, requires_authorization};
pub use error::{Error, Result};
pub use reqwest::{Method, StatusCode};
pub use response::{Payload, Response};
pub use vendor_auth::{Credential, TokenDecision};
