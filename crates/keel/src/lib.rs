//! # Keel
//!
//! **Microservice chassis for request lifecycle observability**
//!
//! Keel is an opinionated chassis that gives every service the same
//! boundary behavior:
//!
//! - **Correlation** - Every request carries a UUID v7 transaction id,
//!   honored from `x-request-id` and echoed on the response
//! - **Body capture** - Request and response payloads are teed into audit
//!   records without buffering or delaying the stream
//! - **Failure taxonomy** - Every failure classifies into one class that
//!   decides its status, audit record, and log severity
//! - **Uniform envelope** - Success and failure responses share one shape
//! - **Live lookup caches** - Messages and params served from memory,
//!   refreshed by the backing store's change feed
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use keel::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ChassisConfig::load(Some("keel.toml"))?;
//!     keel::telemetry::init_logging(&config.logging)?;
//!
//!     let store = InMemoryStore::new();
//!     let messages = Arc::new(MessageCache::new(Arc::new(store.clone())));
//!     let pipeline = Pipeline::builder(
//!         ServiceLogger::new(&config.application_name),
//!         messages,
//!         TraceRecorder::spawn(Arc::new(store.clone())),
//!         ErrorRecorder::spawn(Arc::new(store)),
//!     )
//!     .build();
//!
//!     // Hand each inbound request to `pipeline.process` with your handler.
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Every request flows through the same fixed stages:
//!
//! ```text
//! Request → Gateway → FailureResponder → user filters → Handler
//!                                                          ↓
//! Response ← Gateway ← FailureResponder ← user filters ←──┘
//! ```

#![doc(html_root_url = "https://docs.rs/keel/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use keel_core as core;

// Re-export telemetry types
pub use keel_telemetry as telemetry;

// Re-export persistence types
pub use keel_store as store;

// Re-export cache types
pub use keel_cache as cache;

// Re-export filter types
pub use keel_middleware as middleware;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use keel::prelude::*;
/// ```
pub mod prelude {
    pub use keel_core::{
        ChassisConfig, GenericResponse, KeelError, LifecycleTask, LogLevel, Origin, ServiceError,
        Task, TraceStatus, Traceability, TransactionContext, TransactionId,
    };

    // Re-export the logger
    pub use keel_telemetry::ServiceLogger;

    // Re-export persistence types
    pub use keel_store::{
        ChangeEvent, ChangeFeed, ErrorRecorder, ErrorStore, InMemoryStore, Message, MessageStore,
        OperationType, Param, ParamStore, StoreError, TraceRecorder, TraceStore,
    };

    // Re-export cache types
    pub use keel_cache::{spawn_subscriber, CacheState, MessageCache, MessageKey, ParamCache};

    // Re-export filter types
    pub use keel_middleware::{
        Filter, FnFilter, Next, Pipeline, Request, Response, TRANSACTION_ID_HEADER,
    };
}
