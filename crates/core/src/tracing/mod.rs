//! Tracing setup shared by the client binaries
//!
//! Library code only emits events through the `tracing` macros; installing a
//! subscriber is left to whoever owns `main`.

pub mod config;
#[cfg(feature = "init")]
pub mod init;

pub use config::InstrumentationConfig;
