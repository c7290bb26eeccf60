//! Network layer for the harness.
//!
//! This module contains:
//! - `conn`: client connection with the shared send/recv primitives
//! - `tls`: rustls client setup from a trust anchor file

pub mod conn;
pub mod tls;

pub use conn::{Conn, Limits};
