//! Session invalidation and navigation signals

use super::config::CredentialKeys;
use super::coordinator::RefreshCoordinator;
use std::sync::Arc;
use todo_core::CredentialStore;

/// Places the client can send the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Unauthenticated entry point
    SignIn,
    /// Authenticated landing page
    Home,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Self::SignIn => "/",
            Self::Home => "/home",
        }
    }
}

/// Receives navigation signals; routing itself lives outside this crate
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that only records the signal in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, route: Route) {
        info!(path = route.path(), "Navigation requested");
    }
}

/// Ends the session: clears credentials and sends the user to sign in
///
/// Safe to call any number of times; each call emits one redirect.
pub struct SessionInvalidator {
    store: Arc<dyn CredentialStore>,
    keys: CredentialKeys,
    coordinator: Arc<RefreshCoordinator>,
    navigator: Arc<dyn Navigator>,
}

impl SessionInvalidator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        keys: CredentialKeys,
        coordinator: Arc<RefreshCoordinator>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            store,
            keys,
            coordinator,
            navigator,
        }
    }

    pub fn invalidate(&self) {
        self.coordinator.revoke(|| self.clear_credentials());
        self.redirect();
    }

    /// Remove both tokens and the session mirror from the store
    ///
    /// Store failures are logged; the session is considered over regardless.
    pub(crate) fn clear_credentials(&self) {
        for key in [
            &self.keys.access_token_key,
            &self.keys.refresh_token_key,
            &self.keys.session_key,
        ] {
            if let Err(e) = self.store.clear(key) {
                warn!(key = %key, "Failed to clear credential: {e}");
            }
        }
    }

    pub(crate) fn redirect(&self) {
        info!("Session invalidated");
        self.navigator.navigate(Route::SignIn);
    }
}
