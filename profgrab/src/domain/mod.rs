//! Domain model for profgrab
//!
//! This module contains the caller-facing descriptor types and the two error
//! channels of the fetch pipeline:
//! - [`FetchError`]: one source failed, the run continues
//! - [`GrabError`]: the run as a whole failed

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{Source, SymbolizeMode};

pub use errors::{FetchError, GrabError};
