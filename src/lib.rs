#![deny(clippy::all)]
#![warn(unused_crate_dependencies)]

pub mod common;
pub mod config;
pub mod metrics;
pub mod net;
pub mod payload;
pub mod scenario;
