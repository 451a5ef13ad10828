#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use checkbook_api::{ApiClient, Credentials, Error, TokenPair};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ApiClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn token_body(access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
        "expires_in": 3600
    })
}

fn access_of(client: &ApiClient) -> String {
    client
        .current_tokens()
        .unwrap()
        .access
        .expose_secret()
        .to_owned()
}

// ── Plain requests ──────────────────────────────────────────────────

#[tokio::test]
async fn test_get_sends_bearer_and_decodes_json() {
    let (server, client) = setup().await;
    client.set_tokens(TokenPair::new("abc", None));

    Mock::given(method("GET"))
        .and(path("/entries/3"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3,
            "caption": "Groceries",
            "value": 42.5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let value = client.get("/entries/3").await.unwrap();
    assert_eq!(value["caption"], "Groceries");
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/categories/"))
        .and(body_json(json!({ "caption": "Rent" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 7,
            "caption": "Rent"
        })))
        .mount(&server)
        .await;

    let value = client
        .post("/categories/", &json!({ "caption": "Rent" }))
        .await
        .unwrap();
    assert_eq!(value["id"], 7);
}

#[tokio::test]
async fn test_empty_body_is_null() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/entries/3"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let value = client.delete("/entries/3").await.unwrap();
    assert!(value.is_null());
}

#[tokio::test]
async fn test_server_error_maps_to_http() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/months/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = client.get("/months/").await;
    match result {
        Err(Error::Http { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_not_found_is_recognised() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/entries/99"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.get("/entries/99").await.unwrap_err();
    assert!(err.is_not_found(), "expected not-found, got: {err:?}");
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_uses_password_grant() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_json(json!({
            "grant_type": "password",
            "username": "alice",
            "password": "hunter2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a1", "r1")))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = Credentials {
        username: "alice".into(),
        password: SecretString::from("hunter2".to_string()),
    };
    let pair = client.login(&credentials).await.unwrap();

    assert_eq!(pair.access.expose_secret(), "a1");
    assert_eq!(pair.refresh.as_ref().unwrap().expose_secret(), "r1");
    assert_eq!(access_of(&client), "a1");
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid user credentials"
        })))
        .mount(&server)
        .await;

    let credentials = Credentials {
        username: "alice".into(),
        password: SecretString::from("wrong".to_string()),
    };
    let result = client.login(&credentials).await;

    match result {
        Err(Error::TokenRejected {
            status,
            error,
            description,
        }) => {
            assert_eq!(status, 400);
            assert_eq!(error, "invalid_grant");
            assert_eq!(description.as_deref(), Some("Invalid user credentials"));
        }
        other => panic!("expected TokenRejected, got: {other:?}"),
    }
    assert!(client.current_tokens().is_none());
}

// ── Token renewal ───────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_renews_and_reruns() {
    let (server, client) = setup().await;
    client.set_tokens(TokenPair::new("stale", Some("r1".into())));

    Mock::given(method("GET"))
        .and(path("/months/"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_json(json!({
            "grant_type": "refresh_token",
            "refresh_token": "r1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("fresh", "r2")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/months/"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 600 }])))
        .expect(1)
        .mount(&server)
        .await;

    let value = client.get("/months/").await.unwrap();
    assert_eq!(value, json!([{ "id": 600 }]));
    assert_eq!(access_of(&client), "fresh");
}

#[tokio::test]
async fn test_unauthorized_without_refresh_token_requires_login() {
    let (server, client) = setup().await;
    client.set_tokens(TokenPair::new("stale", None));

    Mock::given(method("GET"))
        .and(path("/months/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("x", "y")))
        .expect(0)
        .mount(&server)
        .await;

    let result = client.get("/months/").await;
    assert!(
        matches!(result, Err(Error::LoginRequired)),
        "expected LoginRequired, got: {result:?}"
    );
    assert!(client.current_tokens().is_none());
}

#[tokio::test]
async fn test_rejected_refresh_discards_tokens() {
    let (server, client) = setup().await;
    client.set_tokens(TokenPair::new("stale", Some("revoked".into())));

    Mock::given(method("GET"))
        .and(path("/categories/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.get("/categories/").await.unwrap_err();
    assert!(matches!(err, Error::LoginRequired));
    assert!(err.is_auth_expired());
    assert!(client.current_tokens().is_none());
}

#[tokio::test]
async fn test_concurrent_unauthorized_negotiate_once() {
    let (server, client) = setup().await;
    let client = Arc::new(client);
    client.set_tokens(TokenPair::new("stale", Some("r1".into())));

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("fresh", "r2")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let a = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.get("/entries/1").await })
    };
    let b = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.get("/entries/2").await })
    };

    assert_eq!(a.await.unwrap().unwrap(), json!({ "ok": true }));
    assert_eq!(b.await.unwrap().unwrap(), json!({ "ok": true }));
}
