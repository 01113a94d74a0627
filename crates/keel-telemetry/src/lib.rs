//! # Keel Telemetry
//!
//! Structured logging for the Keel microservice chassis.
//!
//! This crate provides:
//!
//! - [`init_logging`] - Installs the global `tracing` subscriber
//! - [`ServiceLogger`] - Emits the chassis's structured boundary events

#![doc(html_root_url = "https://docs.rs/keel-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod logger;
mod logging;

pub use error::TelemetryError;
pub use logger::ServiceLogger;
pub use logging::init_logging;
