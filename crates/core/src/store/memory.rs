use super::jar::Jar;
use super::{CookieOptions, CredentialStore};
use crate::{CoreError, CoreResult};
use chrono::Utc;
use std::sync::Mutex;

/// In-process credential store
#[derive(Debug)]
pub struct MemoryStore {
    jar: Mutex<Jar>,
    current_path: String,
}

impl MemoryStore {
    /// Create an empty store reading at the root path
    pub fn new() -> Self {
        Self::with_path("/")
    }

    /// Create an empty store that reads entries visible at `current_path`
    pub fn with_path(current_path: impl Into<String>) -> Self {
        Self {
            jar: Mutex::new(Jar::default()),
            current_path: current_path.into(),
        }
    }

    fn jar(&self) -> CoreResult<std::sync::MutexGuard<'_, Jar>> {
        self.jar
            .lock()
            .map_err(|_| CoreError::store_unavailable("memory store lock poisoned"))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(self.jar()?.get(key, &self.current_path, Utc::now()))
    }

    fn set(&self, key: &str, value: &str, options: CookieOptions) -> CoreResult<()> {
        self.jar()?.set(key, value, options, Utc::now())
    }

    fn clear(&self, key: &str) -> CoreResult<()> {
        self.jar()?.clear(key);
        Ok(())
    }
}
