//! Authentication API client methods

use super::{ApiRequest, ClientError, Route, TodoClient, interceptor};
use crate::types::{LoginRequest, LoginResponse, RegisterRequest};
use serde_json::Value;
use todo_core::{AccessToken, CookieOptions, Session};

impl TodoClient {
    /// Exchange email and password for tokens and start a session
    ///
    /// Never goes through the refresh coordinator: a rejected login is simply
    /// [`ClientError::InvalidCredentials`].
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let request = ApiRequest::post("/auth/login").json(&LoginRequest {
            email: email.trim().to_string(),
            password: password.trim().to_string(),
        })?;
        let response = self.inner.transport.send(&request, None).await?;

        // 400/401/422 are a bad email or password, not a session problem
        if matches!(response.status.as_u16(), 400 | 401 | 422) {
            warn!(status = %response.status, "Sign-in rejected");
            return Err(ClientError::InvalidCredentials(response.text()));
        }
        if !response.is_success() {
            return Err(interceptor::reject(&response));
        }

        let LoginResponse {
            user,
            token,
            refresh_token,
        } = response.json()?;
        let session_json = serde_json::to_string(&user)?;

        let store = &self.inner.store;
        let keys = &self.inner.keys;
        self.inner.coordinator.install(token.clone(), || {
            store.set(&keys.access_token_key, token.as_str(), keys.token_options())?;
            store.set(
                &keys.refresh_token_key,
                refresh_token.as_str(),
                keys.token_options(),
            )?;
            store.set(&keys.session_key, &session_json, CookieOptions::ephemeral())
        })?;

        info!(user_id = %user.id, "Signed in");
        self.inner.navigator.navigate(Route::Home);
        Ok(user)
    }

    /// Create an account; does not sign in
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Value, ClientError> {
        let request = ApiRequest::post("/auth/register").json(&RegisterRequest {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        })?;
        let response = self.inner.transport.send(&request, None).await?;
        if !response.is_success() {
            return Err(interceptor::reject(&response));
        }

        if response.body.is_empty() {
            return Ok(Value::Null);
        }
        response.json()
    }

    /// Restore the session on start-up from a stored access token
    ///
    /// Any failure of `GET /users/me` signs out immediately; no refresh is
    /// attempted here even if a refresh token is stored.
    pub async fn bootstrap(&self) -> Result<Option<Session>, ClientError> {
        let Some(token) = self.inner.coordinator.current_token() else {
            debug!("No stored access token, starting signed out");
            return Ok(None);
        };

        match self.fetch_session(&token).await {
            Ok(session) => {
                info!(user_id = %session.id, "Session restored");
                Ok(Some(session))
            }
            Err(error) => {
                warn!("Session bootstrap failed: {error}");
                self.inner.invalidator.invalidate();
                Err(error)
            }
        }
    }

    async fn fetch_session(&self, token: &AccessToken) -> Result<Session, ClientError> {
        let response = self
            .inner
            .transport
            .send(&ApiRequest::get("/users/me"), Some(token))
            .await?;
        if !response.is_success() {
            return Err(interceptor::reject(&response));
        }

        let session: Session = response.json()?;
        self.inner.store.set(
            &self.inner.keys.session_key,
            &serde_json::to_string(&session)?,
            CookieOptions::ephemeral(),
        )?;
        Ok(session)
    }

    /// Fetch the signed-in user through the refresh-aware path
    pub async fn current_user(&self) -> Result<Session, ClientError> {
        self.execute(ApiRequest::get("/users/me")).await
    }

    /// End the session; safe to call when already signed out
    pub fn sign_out(&self) {
        self.inner.invalidator.invalidate();
    }

    /// The cached session, if signed in
    pub fn session(&self) -> Result<Option<Session>, ClientError> {
        match self.inner.store.get(&self.inner.keys.session_key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Whether an access token is currently held
    pub fn is_authenticated(&self) -> bool {
        self.inner.coordinator.current_token().is_some()
    }
}
