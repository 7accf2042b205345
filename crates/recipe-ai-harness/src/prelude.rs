//! Common imports for typical harness usage.
pub use crate::{
    AbortHandle, Harness, HarnessBuilder, HarnessError, ModelRef, ProviderId, RelayBuilder,
    RelayOptions, RelayStream,
};
pub use recipe_core::StreamEvent;
