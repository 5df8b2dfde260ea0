//! Ticketing server wiring: configuration and the metrics exporter.
//!
//! The binary in `main.rs` connects these to the `PostgreSQL` backend and
//! the HTTP router.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod metrics;

pub use config::{Config, ConfigError};
