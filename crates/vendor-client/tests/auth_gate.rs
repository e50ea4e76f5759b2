use std::time::Duration;

use reqwest::Method;
use serde_json::json;
use vendor_auth::{ExchangeFailure, GrantKind, now_millis};
use vendor_client::{ClientConfig, Credential, Error, Payload, RequestDispatcher};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new("client-123", "shh", "https://app.example.com/callback")
        .with_base_url(server.uri())
}

fn dispatcher(server: &MockServer, credential: Credential) -> RequestDispatcher {
    RequestDispatcher::with_credential(&config(server), credential).expect("dispatcher")
}

fn token_body(access: &str, refresh: &str, expires_in: u64) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": expires_in,
        "token_type": "bearer"
    })
}

async fn mount_current_user(server: &MockServer, bearer: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .and(header("authorization", format!("Bearer {bearer}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "Ada"})))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn fresh_client_exchanges_request_code_then_calls_resource() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc123"))
        .and(body_string_contains("client_id=client-123"))
        .and(body_string_contains("client_secret=shh"))
        .and(body_string_contains("force_login=0"))
        .and(body_string_contains(
            "redirect_uri=https%3A%2F%2Fapp.example.com%2Fcallback",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at_1", "rt_1", 3600)))
        .expect(1)
        .mount(&server)
        .await;
    mount_current_user(&server, "at_1", 1).await;

    let client = dispatcher(&server, Credential::new());
    client.set_request_code("abc123").await;

    let response = client.get_current_user().await.expect("current user");
    assert!(response.is_success());
    assert_eq!(response.payload.field("name"), Some(&json!("Ada")));

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url.path(), "/oauth/token");
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(requests[1].url.path(), "/api/v1/users/me");

    let snapshot = client.auth().snapshot().await;
    assert!(snapshot.is_authorized());
    assert!(!snapshot.has_request_code());
}

#[tokio::test]
async fn expired_token_refreshes_once_before_resource_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at_new",
            "refresh_token": "r2",
            "expires_in": "7200"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_current_user(&server, "at_new", 1).await;

    let client = dispatcher(
        &server,
        Credential::with_tokens("at_old", "r1", now_millis() - 1000),
    );

    let before = now_millis();
    client.get_current_user().await.expect("current user");
    let after = now_millis();

    let snapshot = client.auth().snapshot().await;
    let expires_at = snapshot.expires_at().expect("authorized");
    assert!(
        expires_at >= before + 7_200_000 && expires_at <= after + 7_200_000,
        "expires_at {expires_at} not within [{before}, {after}] + 7200s"
    );
    assert_eq!(snapshot.refresh_token().unwrap().expose(), "r2");
}

#[tokio::test]
async fn no_credentials_fails_without_sending_anything() {
    let server = MockServer::start().await;
    let client = dispatcher(&server, Credential::new());

    let err = client.get_current_user().await.unwrap_err();
    assert!(err.is_authentication_unavailable(), "got: {err:?}");
    assert!(err.to_string().contains("no request code"));
    assert!(!err.is_retryable());

    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty(), "expected zero requests, got {}", requests.len());
}

#[tokio::test]
async fn html_body_comes_back_as_raw_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>error</html>"))
        .mount(&server)
        .await;

    let client = dispatcher(
        &server,
        Credential::with_tokens("at", "rt", now_millis() + 60_000),
    );

    let response = client.get_current_user().await.expect("raw body is not an error");
    assert_eq!(response.status.as_u16(), 502);
    assert_eq!(response.payload, Payload::Raw("<html>error</html>".into()));
    assert!(response.payload.field("id").is_none());
}

#[tokio::test]
async fn every_call_sends_accept_cache_control_and_request_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .and(header("accept", "application/json"))
        .and(header("cache-control", "no-cache"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = dispatcher(
        &server,
        Credential::with_tokens("at", "rt", now_millis() + 60_000),
    );
    client.get_current_user().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let request_id = requests[0]
        .headers
        .get("x-request-id")
        .expect("request id header")
        .to_str()
        .unwrap();
    assert!(request_id.starts_with("req_"), "got: {request_id}");
}

#[tokio::test]
async fn query_params_are_encoded_onto_the_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .and(query_param("q", "rust & tokio"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = dispatcher(
        &server,
        Credential::with_tokens("at", "rt", now_millis() + 60_000),
    );
    let response = client
        .get("/search", &[("q", "rust & tokio"), ("page", "2")])
        .await
        .unwrap();
    assert_eq!(response.payload.field("results"), Some(&json!([])));
}

#[tokio::test]
async fn post_body_is_form_encoded_with_exact_length() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/messages"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(header("authorization", "Bearer at"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 99})))
        .expect(1)
        .mount(&server)
        .await;

    let client = dispatcher(
        &server,
        Credential::with_tokens("at", "rt", now_millis() + 60_000),
    );
    let response = client
        .post("/messages", &[("subject", "hello world"), ("to", "a@b.c")])
        .await
        .unwrap();
    assert_eq!(response.status.as_u16(), 201);

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert_eq!(body, "subject=hello+world&to=a%40b.c");
    let length: usize = requests[0]
        .headers
        .get("content-length")
        .expect("content-length")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(length, body.len());
}

#[tokio::test]
async fn post_without_body_never_reaches_the_server() {
    let server = MockServer::start().await;
    let client = dispatcher(
        &server,
        Credential::with_tokens("at", "rt", now_millis() + 60_000),
    );

    let err = client
        .send("/messages", Method::POST, &[], None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_calls_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("at_shared", "r2", 3600))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_current_user(&server, "at_shared", 3).await;

    let client = dispatcher(&server, Credential::with_refresh_token("r1"));

    let (a, b, c) = tokio::join!(
        client.get_current_user(),
        client.get_current_user(),
        client.get_current_user(),
    );
    for result in [a, b, c] {
        assert!(result.unwrap().is_success());
    }
}

#[tokio::test]
async fn rejected_code_surfaces_exchange_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = dispatcher(&server, Credential::new());
    client.set_request_code("used-code").await;

    let err = client.get_current_user().await.unwrap_err();
    match &err {
        Error::Auth(vendor_auth::Error::TokenExchangeFailed {
            grant: GrantKind::AuthorizationCode,
            cause: ExchangeFailure::Rejected { status: 400, body },
        }) => assert!(body.contains("invalid_grant"), "got: {body}"),
        other => panic!("expected rejected exchange, got {other:?}"),
    }
    assert!(!err.is_retryable());

    // The code was spent; a second call must not resubmit it.
    let again = client.get_current_user().await.unwrap_err();
    assert!(again.is_authentication_unavailable());
}

#[tokio::test]
async fn non_json_token_response_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = dispatcher(&server, Credential::with_refresh_token("r1"));
    let err = client.refresh_token().await.unwrap_err();
    assert!(
        matches!(
            err,
            Error::Auth(vendor_auth::Error::TokenExchangeFailed {
                grant: GrantKind::RefreshToken,
                cause: ExchangeFailure::Malformed(_),
            })
        ),
        "got: {err:?}"
    );
    assert!(!client.auth().is_authorized().await);
}

#[tokio::test]
async fn exchange_token_and_authorize_wrappers_update_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("code=first"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at_1", "rt_1", 3600)))
        .expect(1)
        .mount(&server)
        .await;

    let client = dispatcher(&server, Credential::new());
    let token = client.exchange_token("first").await.unwrap();
    assert_eq!(token.expose(), "at_1");
    assert!(client.auth().is_authorized().await);

    // Still valid: authorize keeps the session and does not spend the code.
    let token = client.authorize("second").await.unwrap();
    assert_eq!(token.expose(), "at_1");
    assert!(client.auth().snapshot().await.has_request_code());
}

#[tokio::test]
async fn transport_failure_on_resource_call_is_retryable() {
    let config = ClientConfig::new("c", "s", "https://x").with_base_url("http://127.0.0.1:1");
    let client = RequestDispatcher::with_credential(
        &config,
        Credential::with_tokens("at", "rt", now_millis() + 60_000),
    )
    .unwrap();

    let err = client.get_current_user().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got: {err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn transport_failure_during_exchange_is_an_exchange_error() {
    let config = ClientConfig::new("c", "s", "https://x").with_base_url("http://127.0.0.1:1");
    let client =
        RequestDispatcher::with_credential(&config, Credential::with_refresh_token("r1")).unwrap();

    let err = client.get_current_user().await.unwrap_err();
    assert!(
        matches!(
            err,
            Error::Auth(vendor_auth::Error::TokenExchangeFailed {
                cause: ExchangeFailure::Transport(_),
                ..
            })
        ),
        "got: {err:?}"
    );
    assert!(err.is_retryable());
}

#[tokio::test]
async fn slow_resource_call_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = config(&server).with_timeout(Duration::from_secs(1));
    let client = RequestDispatcher::with_credential(
        &config,
        Credential::with_tokens("at", "rt", now_millis() + 60_000),
    )
    .unwrap();

    let err = client.get_current_user().await.unwrap_err();
    match err {
        Error::Transport(msg) => assert!(msg.contains("timed out"), "got: {msg}"),
        other => panic!("expected timeout, got {other:?}"),
    }
}
