//! Consumer side of the recipe relay.
//!
//! A `RecipeSession` owns at most one open `/recipeStream` connection and
//! accumulates the recipe text as chunks arrive.

pub mod connector;
pub mod errors;
pub mod session;

pub use connector::{EventStream, HttpConnector, StreamConnector};
pub use errors::ConsumerError;
pub use session::{CONNECTION_FAILURE_MESSAGE, RecipeSession, SessionError, SessionUpdate};
