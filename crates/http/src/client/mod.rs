//! Todo API client
//!
//! [`TodoClient`] sends every request through the same path:
//!
//! 1. the transport attaches the coordinator's current token,
//! 2. the interceptor classifies the response,
//! 3. a `token.expired` 401 is handed to the [`RefreshCoordinator`], which
//!    either starts the single refresh, parks the request behind the one in
//!    flight, or hands back a newer token to retry with,
//! 4. any other 401 ends the session through the [`SessionInvalidator`].

pub mod auth;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod interceptor;
pub mod session;
pub mod transport;

pub use self::config::{ClientConfig, CredentialKeys};
pub use coordinator::{Phase, RefreshCoordinator};
pub use error::ClientError;
pub use session::{Navigator, Route, SessionInvalidator, TracingNavigator};
pub use transport::{ApiRequest, ApiResponse, Transport};

use crate::types::{RefreshRequest, RefreshResponse};
use coordinator::{Admission, Drain, Settlement};
use interceptor::Disposition;
use reqwest::ClientBuilder;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use todo_core::{AccessToken, CredentialStore, MemoryStore, RefreshToken};

const REFRESH_PATH: &str = "/refresh-token";

/// A response that made it past the interceptor
enum Intercepted {
    Passed(ApiResponse),
    Expired,
}

/// Todo API client
///
/// Cheap to clone; clones share the token, the refresh state and the store.
#[derive(Clone)]
pub struct TodoClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Transport,
    store: Arc<dyn CredentialStore>,
    keys: CredentialKeys,
    coordinator: Arc<RefreshCoordinator>,
    invalidator: SessionInvalidator,
    navigator: Arc<dyn Navigator>,
}

impl TodoClient {
    /// Create a new client with default configuration and an in-memory store
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> TodoClientBuilder {
        TodoClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.inner.transport.base_url()
    }

    /// Refresh state machine shared by every clone of this client
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    /// Send a request, refreshing the access token once if it expired
    ///
    /// Non-2xx responses come back as errors: `Status` for ordinary failures,
    /// `AuthInvalid` for a 401 that ended the session, `RefreshFailed` when
    /// the token could not be renewed.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let token = self.inner.coordinator.current_token();
        debug!(method = %request.method, path = %request.path, "Sending request");
        let response = self.inner.transport.send(&request, token.as_ref()).await?;

        match self.intercept(response)? {
            Intercepted::Passed(response) => Ok(response),
            Intercepted::Expired => self.await_refresh(request, token).await,
        }
    }

    /// Send a request and decode the JSON response
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        self.send(request).await?.json()
    }

    fn intercept(&self, response: ApiResponse) -> Result<Intercepted, ClientError> {
        match interceptor::classify(&response) {
            Disposition::Success => Ok(Intercepted::Passed(response)),
            Disposition::ExpiredToken => Ok(Intercepted::Expired),
            Disposition::FatalAuth { code } => {
                warn!(status = %response.status, code = ?code, "Authentication rejected");
                self.inner.invalidator.invalidate();
                Err(ClientError::AuthInvalid { code })
            }
            Disposition::Failure => Err(interceptor::reject(&response)),
        }
    }

    async fn await_refresh(
        &self,
        request: ApiRequest,
        sent_with: Option<AccessToken>,
    ) -> Result<ApiResponse, ClientError> {
        let receiver = match self.inner.coordinator.admit(request.clone(), sent_with.as_ref()) {
            Admission::Retry(token) => return self.replay(request, token).await,
            Admission::Queued(receiver) => receiver,
            Admission::Lead { epoch, receiver } => {
                // Detached so that dropping this caller cannot strand the queue
                let client = self.clone();
                tokio::spawn(async move { client.drive_refresh(epoch).await });
                receiver
            }
        };

        receiver
            .await
            .unwrap_or_else(|_| Err(ClientError::RefreshFailed(Arc::new(ClientError::RefreshAborted))))
    }

    /// Perform the refresh call and settle every queued request
    async fn drive_refresh(&self, epoch: u64) {
        let outcome = self.request_new_tokens().await;

        let (token, refresh_token) = match outcome {
            Ok(RefreshResponse {
                token,
                refresh_token,
            }) => (Ok(token), refresh_token),
            Err(error) => (Err(error), None),
        };
        let persist_token = token.as_ref().ok().cloned();

        let drain = self.inner.coordinator.finish(
            epoch,
            token,
            || self.persist_tokens(persist_token.as_ref(), refresh_token.as_ref()),
            || self.inner.invalidator.clear_credentials(),
        );

        match drain {
            Drain::Replay { token, queue } => {
                // join_all polls in order, so replays are dispatched in arrival order
                futures::future::join_all(queue.into_iter().map(|pending| {
                    let token = token.clone();
                    async move {
                        let outcome: Settlement = self.replay(pending.request.clone(), token).await;
                        pending.settle(outcome);
                    }
                }))
                .await;
            }
            Drain::Reject { error, queue } => {
                self.inner.invalidator.redirect();
                for pending in queue {
                    pending.settle(Err(ClientError::RefreshFailed(error.clone())));
                }
            }
            Drain::Superseded { queue } => {
                // whoever changed the session already redirected if needed
                let error = Arc::new(ClientError::SessionInvalidated);
                for pending in queue {
                    pending.settle(Err(ClientError::RefreshFailed(error.clone())));
                }
            }
        }
    }

    async fn request_new_tokens(&self) -> Result<RefreshResponse, ClientError> {
        let refresh_token = self
            .inner
            .store
            .get(&self.inner.keys.refresh_token_key)?
            .map(RefreshToken::from)
            .ok_or(ClientError::MissingRefreshToken)?;

        let request = ApiRequest::post(REFRESH_PATH).json(&RefreshRequest { refresh_token })?;
        let response = self.inner.transport.send(&request, None).await?;
        if !response.is_success() {
            return Err(interceptor::reject(&response));
        }
        response.json()
    }

    fn persist_tokens(
        &self,
        token: Option<&AccessToken>,
        refresh_token: Option<&RefreshToken>,
    ) -> todo_core::CoreResult<()> {
        let keys = &self.inner.keys;
        if let Some(token) = token {
            self.inner
                .store
                .set(&keys.access_token_key, token.as_str(), keys.token_options())?;
        }
        if let Some(refresh_token) = refresh_token {
            self.inner.store.set(
                &keys.refresh_token_key,
                refresh_token.as_str(),
                keys.token_options(),
            )?;
        }
        Ok(())
    }

    /// Send `request` once more with `token`; a second expiry is not retried
    async fn replay(&self, request: ApiRequest, token: AccessToken) -> Result<ApiResponse, ClientError> {
        debug!(method = %request.method, path = %request.path, "Replaying request");
        let response = self.inner.transport.send(&request, Some(&token)).await?;

        match self.intercept(response)? {
            Intercepted::Passed(response) => Ok(response),
            Intercepted::Expired => Err(ClientError::AuthExpired),
        }
    }
}

/// Builder for TodoClient
#[derive(Default)]
pub struct TodoClientBuilder {
    config: Option<ClientConfig>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    store: Option<Arc<dyn CredentialStore>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl TodoClientBuilder {
    /// Start from a loaded configuration; explicit setters still win
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set the credential store (defaults to an in-memory store)
    pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the navigation sink (defaults to logging the signal)
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<TodoClient, ClientError> {
        let config = match (self.config, self.base_url) {
            (Some(config), Some(base_url)) => ClientConfig { base_url, ..config },
            (Some(config), None) => config,
            (None, Some(base_url)) => ClientConfig {
                base_url,
                ..ClientConfig::default()
            },
            (None, None) => {
                return Err(ClientError::Configuration("base_url is required".into()));
            }
        };
        config.validate()?;

        let mut client_builder = ClientBuilder::new()
            .user_agent(self.user_agent.unwrap_or_else(|| config.user_agent.clone()));

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = self.timeout.or_else(|| config.timeout()) {
            client_builder = client_builder.timeout(timeout);
        }

        let transport = Transport::new(client_builder.build()?, config.base_url);
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(TracingNavigator));
        let keys = config.credentials;

        let token = store.get(&keys.access_token_key)?.map(AccessToken::from);
        let coordinator = Arc::new(RefreshCoordinator::new(token));
        let invalidator = SessionInvalidator::new(
            store.clone(),
            keys.clone(),
            coordinator.clone(),
            navigator.clone(),
        );

        Ok(TodoClient {
            inner: Arc::new(ClientInner {
                transport,
                store,
                keys,
                coordinator,
                invalidator,
                navigator,
            }),
        })
    }
}
