//! Client module
//!
//! This module provides clients for the tasktree store: one over HTTP and one
//! that calls a [`Store`](crate::Store) in-process.

mod core;
mod http;
mod trait_def;

// Re-export the trait and types
pub use self::core::CoreClient;
pub use self::http::{ClientConfig, HttpClientImpl};
pub use trait_def::{Client, ClientError, CommandResult};
