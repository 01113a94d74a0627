//! The uniform response envelope.
//!
//! Every response the chassis produces, success or failure, serializes to
//! this shape. Field names follow the wire contract consumers already
//! depend on, so serialization uses camelCase regardless of the Rust names.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::context::TransactionId;

/// The body of every chassis-produced response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// Origin path of the request.
    pub origin: String,
    /// Resolved human-readable message.
    pub message: String,
    /// When the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Payload documents, when the operation returned any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Value>,
    /// Per-field validation messages, when validation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<HashMap<String, String>>,
    /// Correlation id of the owning request.
    pub request_id: TransactionId,
    /// Failure detail chain. Internal failures never carry it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl GenericResponse {
    /// Creates a success envelope.
    #[must_use]
    pub fn success(
        request_id: TransactionId,
        origin: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        GenericResponse {
            success: true,
            origin: origin.into(),
            message: message.into(),
            timestamp: Utc::now(),
            documents: None,
            validation_errors: None,
            request_id,
            error_details: None,
        }
    }

    /// Creates a failure envelope.
    #[must_use]
    pub fn failure(
        request_id: TransactionId,
        origin: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        GenericResponse {
            success: false,
            origin: origin.into(),
            message: message.into(),
            timestamp: Utc::now(),
            documents: None,
            validation_errors: None,
            request_id,
            error_details: None,
        }
    }

    /// Attaches payload documents.
    #[must_use]
    pub fn with_documents(mut self, documents: Value) -> Self {
        self.documents = Some(documents);
        self
    }

    /// Attaches per-field validation messages.
    #[must_use]
    pub fn with_validation_errors(mut self, errors: HashMap<String, String>) -> Self {
        self.validation_errors = Some(errors);
        self
    }

    /// Attaches the failure detail chain.
    #[must_use]
    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_shape() {
        let id = TransactionId::new();
        let envelope = GenericResponse::success(id, "/api/v1/mock", "operation complete")
            .with_documents(json!([{"id": 1}]));
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["success"], json!(true));
        assert_eq!(value["origin"], json!("/api/v1/mock"));
        assert_eq!(value["message"], json!("operation complete"));
        assert_eq!(value["requestId"], json!(id.to_string()));
        assert_eq!(value["documents"], json!([{"id": 1}]));
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let envelope = GenericResponse::failure(TransactionId::new(), "/x", "failed");
        let value = serde_json::to_value(&envelope).unwrap();

        assert!(value.get("documents").is_none());
        assert!(value.get("validationErrors").is_none());
    }

    #[test]
    fn test_error_details_serialize_when_present() {
        let envelope = GenericResponse::failure(TransactionId::new(), "/x", "failed")
            .with_error_details("duplicate order\ncaused by: key exists");
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            value["errorDetails"],
            json!("duplicate order\ncaused by: key exists")
        );

        let bare = GenericResponse::failure(TransactionId::new(), "/x", "failed");
        let value = serde_json::to_value(&bare).unwrap();
        assert!(value.get("errorDetails").is_none());
    }

    #[test]
    fn test_validation_errors_serialize_camel_case() {
        let mut errors = HashMap::new();
        errors.insert("amount".to_string(), "must be positive".to_string());
        let envelope = GenericResponse::failure(TransactionId::new(), "/x", "invalid")
            .with_validation_errors(errors);
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["validationErrors"]["amount"], json!("must be positive"));
    }
}
