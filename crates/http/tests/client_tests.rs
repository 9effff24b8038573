//! Integration tests for the todo HTTP client

mod common;

use common::Harness;
use serde_json::json;
use std::sync::Arc;
use todo_core::{CredentialStore, FileStore, Session};
use todo_http::{ApiRequest, ClientError, Route, TodoClient};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn login_body() -> serde_json::Value {
    json!({
        "user": {"id": "u-1", "name": "Ada Lovelace", "email": "ada@example.com"},
        "token": "T1",
        "refreshToken": "R1"
    })
}

#[tokio::test]
async fn test_client_builder() {
    let client = TodoClient::builder()
        .base_url("http://localhost:3333/")
        .build();

    assert!(client.is_ok());
    let client = client.unwrap();
    assert_eq!(client.base_url(), "http://localhost:3333");
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_client_builder_requires_base_url() {
    let result = TodoClient::builder().build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_unauthenticated_requests_carry_no_bearer() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(move |req: &wiremock::Request| {
            if req.headers.contains_key("authorization") {
                ResponseTemplate::new(400)
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"ok": true}))
            }
        })
        .mount(&server)
        .await;

    let client = TodoClient::new(server.uri()).unwrap();
    let body: serde_json::Value = client.execute(ApiRequest::get("/health")).await.unwrap();
    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn test_sign_in_stores_tokens_and_session() {
    let h = Harness::signed_out().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "ada@example.com", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body()))
        .expect(1)
        .mount(&h.server)
        .await;

    let session = h
        .client
        .sign_in("  ada@example.com ", " secret ")
        .await
        .unwrap();

    let expected = Session {
        id: "u-1".into(),
        name: "Ada Lovelace".into(),
        email: "ada@example.com".into(),
    };
    assert_eq!(session, expected);
    assert_eq!(h.client.session().unwrap(), Some(expected));
    assert_eq!(h.stored_access_token().as_deref(), Some("T1"));
    assert_eq!(h.stored_refresh_token().as_deref(), Some("R1"));
    assert!(h.client.is_authenticated());
    assert_eq!(h.navigator.routes(), vec![Route::Home]);
}

#[tokio::test]
async fn test_sign_in_token_is_attached_afterwards() {
    let h = Harness::signed_out().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body()))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&h.server)
        .await;

    h.client.sign_in("ada@example.com", "secret").await.unwrap();
    let todos: Vec<serde_json::Value> = h.client.execute(ApiRequest::get("/todos")).await.unwrap();
    assert!(todos.is_empty());
}

#[tokio::test]
async fn test_sign_in_with_bad_credentials() {
    let h = Harness::signed_out().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"message": {"code": "credentials.invalid"}})),
        )
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let err = h
        .client
        .sign_in("ada@example.com", "wrong")
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::InvalidCredentials(_)));
    assert!(!h.client.is_authenticated());
    assert_eq!(h.stored_access_token(), None);
    assert!(h.navigator.routes().is_empty());
}

#[tokio::test]
async fn test_sign_out_twice_is_idempotent() {
    let h = Harness::signed_out().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body()))
        .mount(&h.server)
        .await;
    h.client.sign_in("ada@example.com", "secret").await.unwrap();

    h.client.sign_out();
    let after_once = (
        h.stored_access_token(),
        h.stored_refresh_token(),
        h.client.session().unwrap(),
    );
    h.client.sign_out();
    let after_twice = (
        h.stored_access_token(),
        h.stored_refresh_token(),
        h.client.session().unwrap(),
    );

    assert_eq!(after_once, (None, None, None));
    assert_eq!(after_once, after_twice);
    assert_eq!(
        h.navigator.routes(),
        vec![Route::Home, Route::SignIn, Route::SignIn]
    );
}

#[tokio::test]
async fn test_bootstrap_restores_session() {
    let h = Harness::with_tokens(Some("T1"), Some("R1")).await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u-1", "name": "Ada Lovelace", "email": "ada@example.com"
        })))
        .mount(&h.server)
        .await;

    let session = h.client.bootstrap().await.unwrap().unwrap();
    assert_eq!(session.id, "u-1");
    assert_eq!(h.client.session().unwrap(), Some(session));
}

#[tokio::test]
async fn test_bootstrap_without_token_does_nothing() {
    let h = Harness::signed_out().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    assert!(h.client.bootstrap().await.unwrap().is_none());
    assert!(h.navigator.routes().is_empty());
}

#[tokio::test]
async fn test_bootstrap_failure_signs_out_without_refresh() {
    let h = Harness::with_tokens(Some("T1"), Some("R1")).await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": {"code": "token.expired"}})),
        )
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let err = h.client.bootstrap().await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(h.stored_access_token(), None);
    assert_eq!(h.stored_refresh_token(), None);
    assert_eq!(h.navigator.routes(), vec![Route::SignIn]);
}

#[tokio::test]
async fn test_register_posts_new_user() {
    let h = Harness::signed_out().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "password": "secret"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "u-1"})))
        .expect(1)
        .mount(&h.server)
        .await;

    let created = h
        .client
        .register("Ada Lovelace", "ada@example.com", "secret")
        .await
        .unwrap();
    assert_eq!(created["id"], "u-1");
    assert!(!h.client.is_authenticated());
}

#[tokio::test]
async fn test_network_error_is_propagated() {
    // nothing listens on the discard port
    let client = TodoClient::new("http://127.0.0.1:9").unwrap();

    let err = client.send(ApiRequest::get("/todos")).await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
}

#[tokio::test]
async fn test_file_store_session_survives_restart() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("credentials.json");

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u-1", "name": "Ada Lovelace", "email": "ada@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    {
        let store: Arc<dyn CredentialStore> = Arc::new(FileStore::open(&file).unwrap());
        let client = TodoClient::builder()
            .base_url(server.uri())
            .store(store)
            .build()
            .unwrap();
        client.sign_in("ada@example.com", "secret").await.unwrap();
    }

    let store: Arc<dyn CredentialStore> = Arc::new(FileStore::open(&file).unwrap());
    let client = TodoClient::builder()
        .base_url(server.uri())
        .store(store)
        .build()
        .unwrap();

    assert!(client.is_authenticated());
    // session mirror is ephemeral and must be rebuilt by bootstrap
    assert!(client.session().unwrap().is_none());
    let session = client.bootstrap().await.unwrap().unwrap();
    assert_eq!(session.name, "Ada Lovelace");
}
