//! LLM: Anthropic Messages API adapter used by the conversion service.
//!
//! DESIGN
//! ======
//! Configuration comes from environment variables. Callers depend on the
//! [`LlmChat`] trait so the converter can be exercised with a mock.

pub mod anthropic;
pub mod config;
pub mod types;

pub use anthropic::AnthropicClient;
pub use config::LlmConfig;
pub use types::{LlmChat, LlmError};
