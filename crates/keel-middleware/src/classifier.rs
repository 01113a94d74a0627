//! Failure classification and response shaping.
//!
//! [`FailureResponder`] sits just inside the gateway. Any failure the rest
//! of the chain produces is classified, logged at the severity its class
//! dictates, written to both audit collections, and converted into an
//! enveloped response. Nothing past this filter ever sees an `Err`.

use std::sync::Arc;

use keel_cache::{MessageCache, MessageKey};
use keel_core::{
    GenericResponse, KeelError, LifecycleTask, ServiceError, Traceability, TransactionContext,
};
use keel_store::{ErrorRecorder, TraceRecorder};
use keel_telemetry::ServiceLogger;

use crate::filter::{BoxFuture, Filter, Next};
use crate::types::{envelope_response, Request, Response};

/// Converts classified failures into enveloped responses.
pub struct FailureResponder {
    logger: ServiceLogger,
    messages: Arc<MessageCache>,
    traces: TraceRecorder,
    errors: ErrorRecorder,
}

impl FailureResponder {
    /// Creates the responder.
    #[must_use]
    pub fn new(
        logger: ServiceLogger,
        messages: Arc<MessageCache>,
        traces: TraceRecorder,
        errors: ErrorRecorder,
    ) -> Self {
        Self {
            logger,
            messages,
            traces,
            errors,
        }
    }

    /// Classifies one failure and shapes its response.
    fn respond(&self, ctx: &Arc<TransactionContext>, err: &KeelError) -> Response {
        let status = err.status_code();
        let trace_status = err.trace_status();
        let level = err.log_level();
        let task = err.task();

        // Internal failures respond with the default text; their detail goes
        // to the audit record only. Every other class carries its own message
        // and detail chain.
        let (message, wire_details) = match err {
            KeelError::Internal { .. } => {
                (self.messages.resolve_key(MessageKey::DefaultError), None)
            }
            other => (other.to_string(), Some(other.render_chain())),
        };

        let mut envelope =
            GenericResponse::failure(ctx.transaction_id(), ctx.path(), message.clone());
        if let Some(details) = wire_details {
            envelope = envelope.with_error_details(details);
        }
        if let Some(field_errors) = err.field_errors() {
            envelope = envelope.with_validation_errors(field_errors);
        }

        ctx.set_trace_status(trace_status);
        let mut record =
            Traceability::builder(ctx.transaction_id(), trace_status, LifecycleTask::RequestError)
                .origin(ctx.path())
                .method(ctx.method().clone())
                .response(serde_json::to_string(&envelope).unwrap_or_default());
        if let Some(request) = ctx.request_payload() {
            record = record.request(request);
        }
        self.traces.record(record.build());

        let (error_class, error_method) = task
            .origin
            .as_ref()
            .map_or((String::new(), String::new()), |origin| {
                (origin.class.clone(), origin.method.clone())
            });
        self.errors.record(
            ServiceError::builder(ctx.transaction_id(), task.clone())
                .origin(ctx.path())
                .method(ctx.method().clone())
                .error_origin(error_class, error_method)
                .message(message.clone())
                .stack_trace(err.render_chain())
                .build(),
        );

        let duration = u64::try_from(ctx.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.logger.log(
            level,
            &task,
            &message,
            Some(&serde_json::json!({ "status": status.as_u16() })),
            Some(duration),
        );

        envelope_response(status, &envelope)
    }
}

impl Filter for FailureResponder {
    fn name(&self) -> &'static str {
        "failure-responder"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a Arc<TransactionContext>,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Response, KeelError>> {
        Box::pin(async move {
            match next.run(ctx, request).await {
                Ok(response) => Ok(response),
                Err(err) => Ok(self.respond(ctx, &err)),
            }
        })
    }
}
