//! Transaction context types and the ambient context propagator.
//!
//! A [`TransactionContext`] is created when a request enters the gateway
//! filter and lives until the request terminates. It is made reachable to
//! any component on the same logical task through a tokio task-local, so
//! loggers and audit writers never need the request threaded through their
//! signatures.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::record::TraceStatus;

/// A unique correlation identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes transaction ids naturally sortable
/// in logs and audit collections.
///
/// # Example
///
/// ```
/// use keel_core::TransactionId;
///
/// let id = TransactionId::new();
/// println!("transaction: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new unique transaction id using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `TransactionId` from an existing UUID.
    ///
    /// Useful when a trusted upstream already assigned a correlation id
    /// (e.g. via the `x-request-id` header).
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for TransactionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::str::FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

tokio::task_local! {
    static CURRENT_CONTEXT: Arc<TransactionContext>;
}

/// Per-request state shared by the gateway filter, the exception responder
/// and the structured logger.
///
/// The context is immutable apart from the carried [`TraceStatus`], which
/// the exception responder sets so the gateway's exit record can reflect
/// the failure classification.
#[derive(Debug)]
pub struct TransactionContext {
    /// Correlation id for every log/trace/error record of this request.
    transaction_id: TransactionId,

    /// HTTP method of the inbound request.
    method: http::Method,

    /// Origin path of the inbound request.
    path: String,

    /// When the request entered the pipeline.
    started_at: Instant,

    /// Traceability status carried from the exception responder to the
    /// gateway filter's end-of-request record.
    trace_status: Mutex<Option<TraceStatus>>,

    /// Captured request payload, set by the gateway filter once the request
    /// body has been joined.
    request_payload: Mutex<Option<String>>,
}

impl TransactionContext {
    /// Creates a context for a request entering the pipeline.
    #[must_use]
    pub fn new(transaction_id: TransactionId, method: http::Method, path: impl Into<String>) -> Self {
        Self {
            transaction_id,
            method,
            path: path.into(),
            started_at: Instant::now(),
            trace_status: Mutex::new(None),
            request_payload: Mutex::new(None),
        }
    }

    /// Returns the transaction id.
    #[must_use]
    pub const fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// Returns the HTTP method of the owning request.
    #[must_use]
    pub const fn method(&self) -> &http::Method {
        &self.method
    }

    /// Returns the origin path of the owning request.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the elapsed time since the request entered the pipeline.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Attaches a traceability status to the context.
    ///
    /// Set by the exception responder; read by the gateway filter when it
    /// emits the end-of-request traceability record.
    pub fn set_trace_status(&self, status: TraceStatus) {
        *self.trace_status.lock() = Some(status);
    }

    /// Returns the carried traceability status, if any.
    #[must_use]
    pub fn trace_status(&self) -> Option<TraceStatus> {
        *self.trace_status.lock()
    }

    /// Attaches the captured request payload.
    ///
    /// Set by the gateway filter after the request body is joined, so
    /// downstream stages can attach the payload to their audit records.
    pub fn set_request_payload(&self, payload: impl Into<String>) {
        *self.request_payload.lock() = Some(payload.into());
    }

    /// Returns the captured request payload, if the gateway set one.
    #[must_use]
    pub fn request_payload(&self) -> Option<String> {
        self.request_payload.lock().clone()
    }

    /// Runs `future` with `ctx` as the ambient current context.
    ///
    /// The context is scoped to the logical task, not the OS thread: a
    /// pooled worker picking up another request cannot observe it. Leaving
    /// the scope — by completion or by the future being dropped on client
    /// cancellation — always clears the slot.
    pub async fn scope<F>(ctx: Arc<TransactionContext>, future: F) -> F::Output
    where
        F: std::future::Future,
    {
        CURRENT_CONTEXT.scope(ctx, future).await
    }

    /// Returns the context of the request executing on this task, or
    /// `None` outside a request scope.
    #[must_use]
    pub fn current() -> Option<Arc<TransactionContext>> {
        CURRENT_CONTEXT.try_with(Arc::clone).ok()
    }
}
