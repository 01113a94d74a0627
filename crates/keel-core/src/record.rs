//! Audit record types.
//!
//! [`Traceability`] marks lifecycle checkpoints of a request; a
//! [`ServiceError`] captures the detail of one handled failure. Both carry
//! the owning request's transaction id, so every record a request produces
//! can be correlated after the fact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::TransactionId;
use crate::tasks::{LifecycleTask, Task};

/// Outcome classification attached to a traceability record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceStatus {
    /// The operation failed in an expected, business-level way.
    Failed,
    /// The operation failed unexpectedly.
    Error,
    /// The operation succeeded.
    Success,
    /// Success reported by a legacy system.
    LegacySuccess,
    /// Error reported by a legacy system.
    LegacyError,
    /// Warning reported by a legacy system.
    LegacyWarn,
}

/// A lifecycle checkpoint of one request.
///
/// Two records are produced per request (start, end); a third with
/// [`LifecycleTask::RequestError`] is produced when a failure reaches the
/// boundary. Writes are fire-and-forget.
#[derive(Debug, Clone, Serialize)]
pub struct Traceability {
    /// Correlation id of the owning request.
    pub transaction_id: TransactionId,
    /// Outcome classification.
    pub status: TraceStatus,
    /// Origin path of the request.
    pub origin: String,
    /// HTTP method of the request.
    #[serde(with = "http_serde_method")]
    pub method: http::Method,
    /// Lifecycle checkpoint this record marks.
    pub task: LifecycleTask,
    /// Captured request payload, when available.
    pub request: Option<String>,
    /// Captured response payload, when available.
    pub response: Option<String>,
    /// Wall time from first request byte to terminal response signal.
    pub duration_millis: Option<u64>,
}

impl Traceability {
    /// Creates a builder for a traceability record.
    #[must_use]
    pub fn builder(
        transaction_id: TransactionId,
        status: TraceStatus,
        task: LifecycleTask,
    ) -> TraceabilityBuilder {
        TraceabilityBuilder {
            record: Traceability {
                transaction_id,
                status,
                origin: String::new(),
                method: http::Method::GET,
                task,
                request: None,
                response: None,
                duration_millis: None,
            },
        }
    }
}

/// Builder for [`Traceability`] records.
#[derive(Debug)]
pub struct TraceabilityBuilder {
    record: Traceability,
}

impl TraceabilityBuilder {
    /// Sets the origin path.
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.record.origin = origin.into();
        self
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: http::Method) -> Self {
        self.record.method = method;
        self
    }

    /// Sets the captured request payload.
    #[must_use]
    pub fn request(mut self, request: impl Into<String>) -> Self {
        self.record.request = Some(request.into());
        self
    }

    /// Sets the captured response payload.
    #[must_use]
    pub fn response(mut self, response: impl Into<String>) -> Self {
        self.record.response = Some(response.into());
        self
    }

    /// Sets the measured duration in milliseconds.
    #[must_use]
    pub fn duration_millis(mut self, millis: u64) -> Self {
        self.record.duration_millis = Some(millis);
        self
    }

    /// Finishes the record.
    #[must_use]
    pub fn build(self) -> Traceability {
        self.record
    }
}

/// The detail of one handled failure.
///
/// Exactly one record is produced per failure reaching the boundary.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceError {
    /// Correlation id of the owning request.
    pub transaction_id: TransactionId,
    /// Always `false`; kept for parity with the persisted envelope shape.
    pub success: bool,
    /// Origin path of the request.
    pub origin: String,
    /// HTTP method of the request.
    #[serde(with = "http_serde_method")]
    pub method: http::Method,
    /// Unit of work the failure occurred in.
    pub task: Task,
    /// Class a business failure originated from, else empty.
    pub error_class: String,
    /// Method a business failure originated from, else empty.
    pub error_method: String,
    /// Failure message.
    pub message: String,
    /// Rendered failure chain.
    pub stack_trace: String,
    /// Captured request payload, when available.
    pub request: Option<String>,
    /// Captured response payload, when available.
    pub response: Option<String>,
    /// When the failure was recorded.
    pub created_at: DateTime<Utc>,
}

impl ServiceError {
    /// Creates a builder for a service error record.
    #[must_use]
    pub fn builder(transaction_id: TransactionId, task: Task) -> ServiceErrorBuilder {
        ServiceErrorBuilder {
            record: ServiceError {
                transaction_id,
                success: false,
                origin: String::new(),
                method: http::Method::GET,
                task,
                error_class: String::new(),
                error_method: String::new(),
                message: String::new(),
                stack_trace: String::new(),
                request: None,
                response: None,
                created_at: Utc::now(),
            },
        }
    }
}

/// Builder for [`ServiceError`] records.
#[derive(Debug)]
pub struct ServiceErrorBuilder {
    record: ServiceError,
}

impl ServiceErrorBuilder {
    /// Sets the origin path.
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.record.origin = origin.into();
        self
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: http::Method) -> Self {
        self.record.method = method;
        self
    }

    /// Sets the originating class and method of a business failure.
    #[must_use]
    pub fn error_origin(mut self, class: impl Into<String>, method: impl Into<String>) -> Self {
        self.record.error_class = class.into();
        self.record.error_method = method.into();
        self
    }

    /// Sets the failure message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.record.message = message.into();
        self
    }

    /// Sets the rendered failure chain.
    #[must_use]
    pub fn stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.record.stack_trace = stack_trace.into();
        self
    }

    /// Sets the captured request payload.
    #[must_use]
    pub fn request(mut self, request: impl Into<String>) -> Self {
        self.record.request = Some(request.into());
        self
    }

    /// Sets the captured response payload.
    #[must_use]
    pub fn response(mut self, response: impl Into<String>) -> Self {
        self.record.response = Some(response.into());
        self
    }

    /// Finishes the record.
    #[must_use]
    pub fn build(self) -> ServiceError {
        self.record
    }
}

mod http_serde_method {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(method: &http::Method, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(method.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traceability_builder_defaults() {
        let id = TransactionId::new();
        let record = Traceability::builder(id, TraceStatus::Success, LifecycleTask::StartRequest)
            .origin("/api/v1/mock")
            .method(http::Method::POST)
            .request("{}")
            .build();

        assert_eq!(record.transaction_id, id);
        assert_eq!(record.status, TraceStatus::Success);
        assert_eq!(record.task, LifecycleTask::StartRequest);
        assert_eq!(record.request.as_deref(), Some("{}"));
        assert!(record.response.is_none());
        assert!(record.duration_millis.is_none());
    }

    #[test]
    fn test_traceability_end_record() {
        let record = Traceability::builder(
            TransactionId::new(),
            TraceStatus::Failed,
            LifecycleTask::EndRequest,
        )
        .response("{\"success\":false}")
        .duration_millis(42)
        .build();

        assert_eq!(record.duration_millis, Some(42));
        assert_eq!(record.status, TraceStatus::Failed);
    }

    #[test]
    fn test_service_error_defaults_to_empty_origin_fields() {
        let record = ServiceError::builder(TransactionId::new(), Task::exception_manager())
            .message("boom")
            .build();

        assert!(!record.success);
        assert_eq!(record.error_class, "");
        assert_eq!(record.error_method, "");
        assert_eq!(record.message, "boom");
    }

    #[test]
    fn test_service_error_with_error_origin() {
        let record = ServiceError::builder(TransactionId::new(), Task::exception_manager())
            .error_origin("Foo", "bar()")
            .build();

        assert_eq!(record.error_class, "Foo");
        assert_eq!(record.error_method, "bar()");
    }

    #[test]
    fn test_trace_status_serialization() {
        let json = serde_json::to_string(&TraceStatus::LegacyWarn).unwrap();
        assert_eq!(json, "\"LEGACY_WARN\"");
    }
}
