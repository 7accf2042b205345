//! HTTP surface of the recipe relay: a health check and the
//! `/recipeStream` SSE endpoint.

pub mod config;
pub mod routes;

pub use config::{CorsOrigins, ServerConfig};
pub use routes::{AppState, build_router};
