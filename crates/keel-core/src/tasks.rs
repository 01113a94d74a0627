//! Task tags labeling log, traceability and error records.
//!
//! A [`Task`] identifies the unit of work a record belongs to, optionally
//! with the call-site [`Origin`] that produced it. Tags are immutable
//! values constructed where they are used — attaching an origin yields a
//! new value, so concurrent requests reusing the same tag id can never
//! interfere with each other.

use serde::{Deserialize, Serialize};

/// The class and method a record originated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Type that produced the record.
    pub class: String,
    /// Method that produced the record.
    pub method: String,
}

impl Origin {
    /// Creates an origin for a call site.
    #[must_use]
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ class: \"{}\", method: \"{}\" }}", self.class, self.method)
    }
}

/// An immutable tag naming a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    /// Stable identifier, e.g. `EXCEPTION_MANAGER`.
    pub id: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Call site that produced the record, when known.
    pub origin: Option<Origin>,
}

impl Task {
    /// Creates a tag with no origin.
    #[must_use]
    pub const fn new(id: &'static str, description: &'static str) -> Self {
        Self {
            id,
            description,
            origin: None,
        }
    }

    /// Returns a copy of this tag carrying the given call-site origin.
    #[must_use]
    pub fn with_origin(&self, class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            id: self.id,
            description: self.description,
            origin: Some(Origin::new(class, method)),
        }
    }

    /// Renders the origin for log output, or a placeholder when unset.
    #[must_use]
    pub fn origin_string(&self) -> String {
        match &self.origin {
            Some(origin) => origin.to_string(),
            None => "no origin set".to_string(),
        }
    }

    /// Central failure handling at the request boundary.
    #[must_use]
    pub const fn exception_manager() -> Self {
        Self::new("EXCEPTION_MANAGER", "Exception Manager")
    }

    /// Inbound side of the gateway filter.
    #[must_use]
    pub const fn http_request_filter() -> Self {
        Self::new("HTTP_REQUEST_FILTER", "HTTP Request Filter")
    }

    /// Outbound side of the gateway filter.
    #[must_use]
    pub const fn http_response_filter() -> Self {
        Self::new("HTTP_RESPONSE_FILTER", "HTTP Response Filter")
    }

    /// Traceability record persistence.
    #[must_use]
    pub const fn create_traceability() -> Self {
        Self::new("CREATE_TRACEABILITY", "Create Traceability")
    }

    /// Service error record persistence.
    #[must_use]
    pub const fn create_service_error() -> Self {
        Self::new("CREATE_SERVICE_ERROR", "Create Service Error")
    }

    /// Message cache refresh triggered by a change-feed event.
    #[must_use]
    pub const fn message_cache_updated() -> Self {
        Self::new("MESSAGE_CACHE_UPDATED", "Message Cache Updated")
    }

    /// Param cache refresh triggered by a change-feed event.
    #[must_use]
    pub const fn param_cache_updated() -> Self {
        Self::new("PARAM_CACHE_UPDATED", "Param Cache Updated")
    }

    /// Process startup.
    #[must_use]
    pub const fn init_service() -> Self {
        Self::new("INIT_MICROSERVICE", "Init Service")
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Task {{ id: '{}', description: '{}', origin: {} }}",
            self.id,
            self.description,
            self.origin_string()
        )
    }
}

/// Lifecycle checkpoint a traceability record marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleTask {
    /// Request entered the pipeline.
    StartRequest,
    /// A failure reached the boundary.
    RequestError,
    /// Request terminated.
    EndRequest,
}

impl LifecycleTask {
    /// Returns the stable identifier used in persisted records.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::StartRequest => "START_REQUEST",
            Self::RequestError => "REQUEST_ERROR",
            Self::EndRequest => "END_REQUEST",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_origin_does_not_mutate_source() {
        let base = Task::exception_manager();
        let tagged = base.with_origin("MockHandler", "handle()");

        assert!(base.origin.is_none(), "source tag must stay origin-free");
        let origin = tagged.origin.expect("origin should be set");
        assert_eq!(origin.class, "MockHandler");
        assert_eq!(origin.method, "handle()");
    }

    #[test]
    fn test_origin_string_placeholder() {
        let task = Task::http_request_filter();
        assert_eq!(task.origin_string(), "no origin set");
    }

    #[test]
    fn test_origin_string_format() {
        let task = Task::exception_manager().with_origin("Foo", "bar()");
        assert_eq!(task.origin_string(), "{ class: \"Foo\", method: \"bar()\" }");
    }

    #[test]
    fn test_well_known_ids() {
        assert_eq!(Task::exception_manager().id, "EXCEPTION_MANAGER");
        assert_eq!(Task::http_request_filter().id, "HTTP_REQUEST_FILTER");
        assert_eq!(Task::http_response_filter().id, "HTTP_RESPONSE_FILTER");
        assert_eq!(Task::message_cache_updated().id, "MESSAGE_CACHE_UPDATED");
        assert_eq!(Task::param_cache_updated().id, "PARAM_CACHE_UPDATED");
    }

    #[test]
    fn test_lifecycle_task_ids() {
        assert_eq!(LifecycleTask::StartRequest.id(), "START_REQUEST");
        assert_eq!(LifecycleTask::RequestError.id(), "REQUEST_ERROR");
        assert_eq!(LifecycleTask::EndRequest.id(), "END_REQUEST");
    }

    #[test]
    fn test_lifecycle_task_serialization() {
        let json = serde_json::to_string(&LifecycleTask::StartRequest).unwrap();
        assert_eq!(json, "\"START_REQUEST\"");
    }
}
