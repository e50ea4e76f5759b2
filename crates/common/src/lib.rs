//! Types shared by the vendor client crates
//!
//! `Secret` keeps OAuth client secrets and tokens out of logs; `Error` covers
//! configuration loading failures.

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
