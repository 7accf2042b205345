//! Shared building blocks for the recipe relay: the request model, the prompt
//! template, the `{action, ...}` stream event envelope and SSE framing.

/// Stream event envelope relayed to clients.
pub mod event;
/// Process-wide tracing setup.
pub mod observability;
/// Prompt template.
pub mod prompt;
/// Recipe request model and query decoding.
pub mod request;
/// Incremental SSE frame decoding.
pub mod sse;

pub use event::{StreamEvent, UPSTREAM_FAILURE_MESSAGE};
pub use observability::{ConsoleTarget, init_observability, init_observability_to};
pub use prompt::build_prompt;
pub use request::{Complexity, Cuisine, MealType, RecipeQuery, RecipeRequest};
pub use sse::{SseDecoder, SseFrame};
