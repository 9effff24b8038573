//! Client configuration

use super::ClientError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use todo_core::CookieOptions;

const DAY: u64 = 60 * 60 * 24;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API base URL, e.g. `http://localhost:3333`
    pub base_url: String,

    /// Request timeout in seconds (0 disables the timeout)
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// Where credentials live in the store
    pub credentials: CredentialKeys,
}

/// Credential store keys and cookie attributes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialKeys {
    pub access_token_key: String,
    pub refresh_token_key: String,
    /// Ephemeral mirror of the signed-in user
    pub session_key: String,
    /// Path both tokens are scoped to
    pub path: String,
    /// Lifetime of the persisted tokens in days
    pub max_age_days: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3333".to_string(),
            timeout_secs: 30,
            user_agent: concat!("todo-client/", env!("CARGO_PKG_VERSION")).to_string(),
            credentials: CredentialKeys::default(),
        }
    }
}

impl Default for CredentialKeys {
    fn default() -> Self {
        Self {
            access_token_key: "todo-list.token".to_string(),
            refresh_token_key: "todo-list.refreshToken".to_string(),
            session_key: "todo-list.user".to_string(),
            path: "/".to_string(),
            max_age_days: 30,
        }
    }
}

impl CredentialKeys {
    /// Attributes for the persisted tokens
    pub fn token_options(&self) -> CookieOptions {
        CookieOptions::persistent(
            Duration::from_secs(self.max_age_days.saturating_mul(DAY)),
            &self.path,
        )
    }
}

impl ClientConfig {
    /// Load configuration from defaults, an optional file and `TODO__*` environment variables
    ///
    /// Nested keys use a double underscore, e.g. `TODO__CREDENTIALS__PATH=/app`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value has the wrong type
    pub fn load(path: Option<&Path>) -> Result<Self, ClientError> {
        let defaults = Self::default();

        let mut builder = ::config::Config::builder()
            .set_default("base_url", defaults.base_url)?
            .set_default("timeout_secs", defaults.timeout_secs)?
            .set_default("user_agent", defaults.user_agent)?
            .set_default(
                "credentials.access_token_key",
                defaults.credentials.access_token_key,
            )?
            .set_default(
                "credentials.refresh_token_key",
                defaults.credentials.refresh_token_key,
            )?
            .set_default("credentials.session_key", defaults.credentials.session_key)?
            .set_default("credentials.path", defaults.credentials.path)?
            .set_default("credentials.max_age_days", defaults.credentials.max_age_days)?;

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix("TODO")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the base URL is an absolute http(s) URL
    pub fn validate(&self) -> Result<(), ClientError> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| ClientError::Configuration(format!("base_url {}: {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Configuration(format!(
                "base_url must be http or https, got {}",
                url.scheme()
            )));
        }
        Ok(())
    }

    /// Request timeout, if enabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}
