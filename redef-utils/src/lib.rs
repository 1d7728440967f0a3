//! Shared utilities for the redef reaching-definitions engine.
mod errors;

pub use errors::{RdError, RdResult};
