//! Common types shared by the stream, zone and pool layers.
//!
//! This module provides the crate error type, the soft-defect diagnostics
//! sink and legacy charset decoding.

// Submodule declarations
pub mod diagnostics;
pub mod encoding;
pub mod error;

// Re-exports for convenience
pub use diagnostics::{DiagnosticKind, Diagnostics};
pub use error::{Error, Result};
