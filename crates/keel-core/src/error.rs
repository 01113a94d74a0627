//! Failure taxonomy.
//!
//! Every failure that reaches the service boundary is classified into one
//! [`KeelError`] variant. The variant decides the response status, the
//! traceability status, and the log severity, so classification happens in
//! exactly one place.

use std::collections::HashMap;

use http::StatusCode;
use thiserror::Error;

use crate::record::TraceStatus;
use crate::tasks::Task;

/// A classified failure.
#[derive(Debug, Error)]
pub enum KeelError {
    /// An expected, business-level failure raised by a service operation.
    #[error("{message}")]
    Business {
        /// Human-readable failure message.
        message: String,
        /// Status to respond with, when the raiser chose one.
        status: Option<StatusCode>,
        /// Unit of work the failure was raised from.
        task: Task,
    },

    /// Input that failed structural validation.
    #[error("{message}")]
    Validation {
        /// Human-readable failure message.
        message: String,
        /// Per-field validation messages.
        field_errors: HashMap<String, String>,
    },

    /// A required request value was absent.
    #[error("missing required value: {label}")]
    MissingValue {
        /// Name of the absent value.
        name: String,
        /// Label shown to the caller.
        label: String,
    },

    /// A request body that could not be parsed.
    #[error("{message}")]
    Malformed {
        /// Human-readable failure message.
        message: String,
    },

    /// Any failure the other variants do not cover.
    #[error("{message}")]
    Internal {
        /// Human-readable failure message.
        message: String,
        /// Underlying cause, when one exists.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl KeelError {
    /// Creates a business failure with the default conflict status.
    #[must_use]
    pub fn business(message: impl Into<String>, task: Task) -> Self {
        KeelError::Business {
            message: message.into(),
            status: None,
            task,
        }
    }

    /// Creates a business failure with an explicit response status.
    #[must_use]
    pub fn business_with_status(
        message: impl Into<String>,
        status: StatusCode,
        task: Task,
    ) -> Self {
        KeelError::Business {
            message: message.into(),
            status: Some(status),
            task,
        }
    }

    /// Creates a validation failure.
    #[must_use]
    pub fn validation(
        message: impl Into<String>,
        field_errors: HashMap<String, String>,
    ) -> Self {
        KeelError::Validation {
            message: message.into(),
            field_errors,
        }
    }

    /// Creates a missing-value failure.
    #[must_use]
    pub fn missing_value(name: impl Into<String>, label: impl Into<String>) -> Self {
        KeelError::MissingValue {
            name: name.into(),
            label: label.into(),
        }
    }

    /// Creates a malformed-input failure.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        KeelError::Malformed {
            message: message.into(),
        }
    }

    /// Creates an internal failure.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        KeelError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an arbitrary error as an internal failure.
    #[must_use]
    pub fn from_source(source: anyhow::Error) -> Self {
        KeelError::Internal {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// The HTTP status this failure responds with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            KeelError::Business { status, .. } => status.unwrap_or(StatusCode::CONFLICT),
            KeelError::Validation { .. }
            | KeelError::MissingValue { .. }
            | KeelError::Malformed { .. } => StatusCode::BAD_REQUEST,
            KeelError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The traceability status recorded for this failure.
    #[must_use]
    pub fn trace_status(&self) -> TraceStatus {
        match self {
            KeelError::Business { .. } => TraceStatus::Failed,
            _ => TraceStatus::Error,
        }
    }

    /// The severity this failure is logged at.
    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        match self {
            KeelError::Business { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    /// The unit of work attributed to this failure.
    ///
    /// Business failures carry the task they were raised from; every other
    /// variant is attributed to the exception manager.
    #[must_use]
    pub fn task(&self) -> Task {
        match self {
            KeelError::Business { task, .. } => task.clone(),
            _ => Task::exception_manager(),
        }
    }

    /// Per-field failure messages, when this failure names fields.
    ///
    /// Validation failures carry their own map; a missing value maps its
    /// name to a message built from the caller-facing label.
    #[must_use]
    pub fn field_errors(&self) -> Option<HashMap<String, String>> {
        match self {
            KeelError::Validation { field_errors, .. } => Some(field_errors.clone()),
            KeelError::MissingValue { name, label } => {
                let mut fields = HashMap::new();
                fields.insert(name.clone(), format!("Required {label} is not present."));
                Some(fields)
            }
            _ => None,
        }
    }

    /// Renders the failure chain, outermost first.
    #[must_use]
    pub fn render_chain(&self) -> String {
        let mut rendered = self.to_string();
        let mut cause: Option<&(dyn std::error::Error + 'static)> =
            std::error::Error::source(self);
        while let Some(err) = cause {
            rendered.push_str("\ncaused by: ");
            rendered.push_str(&err.to_string());
            cause = err.source();
        }
        rendered
    }
}

/// Severity at which a boundary event is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Routine events.
    Info,
    /// Expected failures.
    Warn,
    /// Unexpected failures.
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_defaults_to_conflict() {
        let err = KeelError::business("duplicate order", Task::exception_manager());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.trace_status(), TraceStatus::Failed);
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_business_with_explicit_status() {
        let err = KeelError::business_with_status(
            "gone",
            StatusCode::GONE,
            Task::exception_manager(),
        );
        assert_eq!(err.status_code(), StatusCode::GONE);
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let mut fields = HashMap::new();
        fields.insert("amount".to_string(), "must be positive".to_string());
        let err = KeelError::validation("invalid request", fields);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.trace_status(), TraceStatus::Error);
        assert_eq!(err.log_level(), LogLevel::Error);
        assert_eq!(
            err.field_errors().unwrap().get("amount").map(String::as_str),
            Some("must be positive")
        );
    }

    #[test]
    fn test_missing_value_maps_to_bad_request() {
        let err = KeelError::missing_value("x-client-id", "header 'x-client-id'");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("x-client-id"));
    }

    #[test]
    fn test_missing_value_names_its_field() {
        let err = KeelError::missing_value("x-client-id", "header 'x-client-id'");
        let fields = err.field_errors().unwrap();
        assert_eq!(
            fields.get("x-client-id").map(String::as_str),
            Some("Required header 'x-client-id' is not present.")
        );
    }

    #[test]
    fn test_internal_maps_to_server_error() {
        let err = KeelError::internal("connection reset");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.trace_status(), TraceStatus::Error);
        assert_eq!(err.task().id, "EXCEPTION_MANAGER");
    }

    #[test]
    fn test_business_carries_its_task() {
        let task = Task::create_traceability().with_origin("OrderService", "create");
        let err = KeelError::business("rejected", task);
        assert_eq!(err.task().id, Task::create_traceability().id);
    }

    #[test]
    fn test_render_chain_includes_source() {
        let source = anyhow::anyhow!("io failure");
        let err = KeelError::from_source(source.context("fetching rates"));
        let chain = err.render_chain();
        assert!(chain.contains("fetching rates"));
        assert!(chain.contains("caused by"));
    }
}
