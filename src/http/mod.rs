//! Shared outbound HTTP plumbing.
//!
//! Both the HR API and the language model are reached through the same
//! middleware stack so every request gets a tracing span.

mod client;

pub use client::{HttpClient, build_client};
