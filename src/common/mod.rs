//! Common types shared across the harness.
//!
//! - Error types for unified error handling

pub mod error;

pub use error::HarnessError;
