//! Shared fixtures for the client integration tests

#![allow(dead_code)]

use serde_json::json;
use std::sync::{Arc, Mutex};
use todo_core::{CredentialStore, MemoryStore};
use todo_http::{CredentialKeys, Navigator, Route, TodoClient};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Navigator that remembers every signal
#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

pub struct Harness {
    pub server: MockServer,
    pub store: Arc<MemoryStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub keys: CredentialKeys,
    pub client: TodoClient,
}

impl Harness {
    /// Client with nothing stored
    pub async fn signed_out() -> Self {
        Self::with_tokens(None, None).await
    }

    /// Client whose store already holds the given tokens
    pub async fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        let server = MockServer::start().await;
        let keys = CredentialKeys::default();
        let store = Arc::new(MemoryStore::new());
        if let Some(access) = access {
            store
                .set(&keys.access_token_key, access, keys.token_options())
                .unwrap();
        }
        if let Some(refresh) = refresh {
            store
                .set(&keys.refresh_token_key, refresh, keys.token_options())
                .unwrap();
        }
        let navigator = Arc::new(RecordingNavigator::default());

        let client = TodoClient::builder()
            .base_url(server.uri())
            .store(store.clone())
            .navigator(navigator.clone())
            .build()
            .unwrap();

        Self {
            server,
            store,
            navigator,
            keys,
            client,
        }
    }

    pub fn stored_access_token(&self) -> Option<String> {
        self.store.get(&self.keys.access_token_key).unwrap()
    }

    pub fn stored_refresh_token(&self) -> Option<String> {
        self.store.get(&self.keys.refresh_token_key).unwrap()
    }
}

pub fn expired_body() -> serde_json::Value {
    json!({"message": {"code": "token.expired"}})
}

/// `GET {route}` answers 401 `token.expired` to `Bearer {stale}` and 200 to `Bearer {fresh}`
pub async fn mount_protected(server: &MockServer, route: &str, stale: &str, fresh: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("authorization", format!("Bearer {stale}").as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(expired_body()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(route))
        .and(header("authorization", format!("Bearer {fresh}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"path": route})))
        .expect(1)
        .named(format!("replay of {route}"))
        .mount(server)
        .await;
}
