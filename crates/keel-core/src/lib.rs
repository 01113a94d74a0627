//! # Keel Core
//!
//! Core types for the Keel microservice chassis.
//!
//! This crate provides the foundational types used throughout Keel:
//!
//! - [`TransactionContext`] - Per-request context carrying the correlation id
//! - [`TransactionId`] - UUID v7 correlation identifier
//! - [`KeelError`] - The failure taxonomy every boundary failure classifies into
//! - [`GenericResponse`] - The uniform response envelope
//! - [`Traceability`] / [`ServiceError`] - Audit records
//! - [`Task`] - Named units of work attributed in logs and records
//! - [`ChassisConfig`] - Layered chassis configuration

#![doc(html_root_url = "https://docs.rs/keel-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod context;
mod envelope;
mod error;
mod record;
mod tasks;

pub use config::{
    CacheConfig, CaptureConfig, ChassisConfig, CollectionNames, ConfigError, LogFormat,
    LoggingConfig,
};
pub use context::{TransactionContext, TransactionId};
pub use envelope::GenericResponse;
pub use error::{KeelError, LogLevel};
pub use record::{
    ServiceError, ServiceErrorBuilder, TraceStatus, Traceability, TraceabilityBuilder,
};
pub use tasks::{LifecycleTask, Origin, Task};
