//! Common types used throughout the filter chain.
//!
//! Bodies are boxed so filters can wrap a streaming body without changing
//! the chain's types.

use bytes::Bytes;
use http_body_util::BodyExt;
use http_body_util::Full;
use keel_core::GenericResponse;

/// Header the chassis reads and echoes the transaction id on.
pub const TRANSACTION_ID_HEADER: &str = "x-request-id";

/// A boxed HTTP body.
pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, std::convert::Infallible>;

/// The HTTP request type used in the filter chain.
pub type Request = http::Request<BoxBody>;

/// The HTTP response type used in the filter chain.
pub type Response = http::Response<BoxBody>;

/// Boxes a complete in-memory body.
#[must_use]
pub fn full_body(bytes: impl Into<Bytes>) -> BoxBody {
    Full::new(bytes.into()).map_err(|never| match never {}).boxed()
}

/// Boxes an empty body.
#[must_use]
pub fn empty_body() -> BoxBody {
    full_body(Bytes::new())
}

/// Builds a response carrying a serialized envelope.
///
/// The transaction id is echoed both in the envelope and on the
/// `x-request-id` header.
#[must_use]
pub fn envelope_response(status: http::StatusCode, envelope: &GenericResponse) -> Response {
    let body = serde_json::to_vec(envelope).unwrap_or_else(|_| b"{}".to_vec());
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .header(TRANSACTION_ID_HEADER, envelope.request_id.to_string())
        .body(full_body(body))
        .unwrap_or_else(|_| {
            let mut response = http::Response::new(empty_body());
            *response.status_mut() = status;
            response
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use keel_core::TransactionId;

    #[tokio::test]
    async fn test_envelope_response_shape() {
        let id = TransactionId::new();
        let envelope = GenericResponse::failure(id, "/api/v1/mock", "failed");
        let response = envelope_response(http::StatusCode::CONFLICT, &envelope);

        assert_eq!(response.status(), http::StatusCode::CONFLICT);
        assert_eq!(
            response
                .headers()
                .get(TRANSACTION_ID_HEADER)
                .unwrap()
                .to_str()
                .unwrap(),
            id.to_string()
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["success"], serde_json::json!(false));
    }
}
