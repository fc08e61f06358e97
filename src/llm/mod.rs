//! Chat-completions client used for the assistant's tool-calling loop.

mod client;
mod types;

pub use client::ChatClient;
pub use types::{ChatMessage, Role, ToolDefinition};
