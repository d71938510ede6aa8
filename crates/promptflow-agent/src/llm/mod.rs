//! LLM integration layer.
//!
//! - [`types`] -- messages, requests and parsed replies.
//! - [`client`] -- HTTP client for OpenAI-compatible chat-completions
//!   endpoints.

pub mod client;
pub mod types;

pub use client::{LlmClient, LlmClientConfig, strip_code_fences};
pub use types::{ChatRequest, ChatResponse, Message, ResponseFormat, Role, Usage};
