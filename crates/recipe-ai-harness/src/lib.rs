//! Prompt-to-stream relay over streaming LLM chat completions.
//!
//! A `Harness` holds the registered provider adapters. Each relay opens one
//! provider stream and turns it into `recipe_core::StreamEvent`s: zero or
//! more `Chunk`s followed by exactly one `Close` or `Error`.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use recipe_ai_harness::prelude::*;
//! use recipe_ai_harness::vendors::openai_compat::OpenAiCompatProvider;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), HarnessError> {
//! let harness = Harness::builder()
//!     .register_provider(Arc::new(OpenAiCompatProvider::from_env("groq")?))
//!     .build()?;
//!
//! let mut relay = harness
//!     .relay(ModelRef::new("groq", "llama-3.1-8b-instant"))
//!     .prompt("Generate a recipe with rice and beans.")
//!     .start_stream()
//!     .await?;
//!
//! while let Some(event) = relay.next_event().await {
//!     if let StreamEvent::Chunk { text } = event {
//!         print!("{text}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Public error types used by the harness API.
pub mod errors;
/// Harness entry point and builder.
pub mod harness;
/// Model and provider identifiers plus relay options.
pub mod model;
/// Common imports for typical usage.
pub mod prelude;
/// Provider adapter contracts used by vendor integrations.
pub mod provider;
/// Relay builder, relay stream and abort handle.
pub mod relay;
/// Vendor-specific integrations.
pub mod vendors;

pub use errors::{HarnessError, ProviderError, RelayFailure};
pub use harness::{Harness, HarnessBuilder};
pub use model::{ModelRef, ProviderId, RelayOptions};
pub use provider::{
    ProviderAdapter, ProviderEvent, ProviderEventStream, ProviderRequest, ProviderStreamHandle,
};
pub use relay::{AbortHandle, RelayBuilder, RelayStream};
