//! Todo client core types and utilities

pub mod error;
pub mod store;
pub mod tracing;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use store::{CookieOptions, CredentialStore, FileStore, MemoryStore};
pub use types::{AccessToken, RefreshToken, Session};
