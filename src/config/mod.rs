//! Configuration module for echoprobe.
//!
//! This module provides all configuration types and parsing logic:
//! - `Config` - Root configuration container
//! - `Target` - Server under test endpoint
//! - `Harness` - Trial counts, payload size, timeouts, seed
//! - `Tls` - Secure probe settings (trust anchor, protocol version)

mod parser;
mod types;

pub use parser::load_config;
pub use types::*;
