//! Request metrics
//!
//! Emitted through the `metrics` facade. Nothing is recorded unless the
//! embedding application installs a recorder.
//!
//! - `vendor_requests_total` (counter): labels `method`, `status`
//! - `vendor_request_duration_seconds` (histogram): label `endpoint_kind`
//! - `vendor_transport_errors_total` (counter): label `error_type`
//!
//! Token exchange and auth decision counters are emitted by `vendor-auth`.

/// Record a completed call.
pub fn record_request(method: &str, status: u16, token_endpoint: bool, duration_secs: f64) {
    metrics::counter!(
        "vendor_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    let kind = if token_endpoint { "token" } else { "resource" };
    metrics::histogram!("vendor_request_duration_seconds", "endpoint_kind" => kind)
        .record(duration_secs);
}

/// Record a call that never got a response.
pub fn record_transport_error(timeout: bool) {
    let error_type = if timeout { "timeout" } else { "connect" };
    metrics::counter!("vendor_transport_errors_total", "error_type" => error_type).increment(1);
}
