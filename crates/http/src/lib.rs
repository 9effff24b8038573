//! Authenticated HTTP client for the todo API
//!
//! The interesting part is [`client::coordinator`]: when many in-flight
//! requests discover an expired access token at once, exactly one refresh is
//! issued and every stalled request is replayed with the new token, or the
//! whole cohort fails and the session ends.

#[macro_use]
extern crate tracing;

pub mod client;
pub mod types;

pub use client::{
    ApiRequest, ApiResponse, ClientConfig, ClientError, CredentialKeys, Navigator, Phase,
    RefreshCoordinator, Route, TodoClient, TodoClientBuilder, TracingNavigator,
};

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
