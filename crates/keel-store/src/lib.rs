//! # Keel Store
//!
//! Persistence traits, change feed, and audit recorders for the Keel chassis.
//!
//! This crate provides:
//!
//! - [`MessageStore`] / [`ParamStore`] - Read access to the lookup collections
//! - [`TraceStore`] / [`ErrorStore`] - Write access to the audit collections
//! - [`ChangeFeed`] - Collection change notifications
//! - [`TraceRecorder`] / [`ErrorRecorder`] - Fire-and-forget audit writers
//! - [`InMemoryStore`] - Process-local implementation of every trait

#![doc(html_root_url = "https://docs.rs/keel-store/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod feed;
mod memory;
mod recorder;
mod store;

pub use error::{StoreError, StoreResult};
pub use feed::{ChangeEvent, ChangeFeed, ChangeStream, OperationType};
pub use memory::InMemoryStore;
pub use recorder::{describe_recorder_metrics, ErrorRecorder, TraceRecorder};
pub use store::{ErrorStore, Message, MessageStore, Param, ParamStore, TraceStore};
