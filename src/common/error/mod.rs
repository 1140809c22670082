//! Unified error types for starzone.
//!
//! This module provides the single error type shared by the byte stream,
//! the record zone and the attribute pool.

// Submodule declarations
pub mod types;

// Re-exports
pub use types::{Error, Result};
