//! OpenAI-compatible chat-completions integration (Groq by default).
//!
//! Vendor-specific configuration lives here so the relay stays
//! provider-agnostic.
mod adapter;
mod config;
pub(crate) mod transport;

pub use adapter::OpenAiCompatProvider;
pub use config::{DEFAULT_BASE_URL, OpenAiCompatConfig};
