//! Credential storage
//!
//! Tokens and the session mirror are kept behind [`CredentialStore`], an opaque
//! key/value interface modelled on browser cookies: every entry may carry a
//! `max_age` after which it disappears, and a `path` that scopes where it is
//! visible. Entries written without a `max_age` live only as long as the store
//! instance, the same way session storage does.

mod file;
mod jar;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::CoreResult;
use std::time::Duration;

/// Attributes applied when writing an entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    /// Lifetime of the entry; `None` keeps it for the life of the store only
    pub max_age: Option<Duration>,
    /// Path prefix the entry is visible under; `None` means `/`
    pub path: Option<String>,
}

impl CookieOptions {
    /// Persistent entry scoped to `path`
    pub fn persistent(max_age: Duration, path: impl Into<String>) -> Self {
        Self {
            max_age: Some(max_age),
            path: Some(path.into()),
        }
    }

    /// Entry that is never written to durable storage
    pub fn ephemeral() -> Self {
        Self::default()
    }
}

/// Opaque persisted key/value store for credentials
pub trait CredentialStore: Send + Sync {
    /// Read the value visible at the store's current path
    fn get(&self, key: &str) -> CoreResult<Option<String>>;

    /// Write `value` under `key`, replacing any entry with the same path
    fn set(&self, key: &str, value: &str, options: CookieOptions) -> CoreResult<()>;

    /// Remove `key` for every path it was set under
    fn clear(&self, key: &str) -> CoreResult<()>;
}
