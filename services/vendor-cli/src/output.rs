//! Rendering API responses for the terminal

use anyhow::Result;
use vendor_client::{Payload, Response};

/// Pretty JSON for JSON bodies. Raw bodies are printed verbatim under a
/// notice, since they can't be treated as structured data.
pub fn render(response: &Response) -> Result<String> {
    let status = response.status.as_u16();
    match &response.payload {
        Payload::Json(value) => Ok(format!("{}\n", serde_json::to_string_pretty(value)?)),
        Payload::Raw(text) => Ok(format!(
            "# HTTP {status}: response body is not JSON\n{text}\n"
        )),
    }
}
