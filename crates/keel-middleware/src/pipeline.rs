//! Fixed-order filter pipeline.
//!
//! Every request flows through the same stages in the same order:
//!
//! 1. **Gateway** - correlation, body capture, start/end checkpoints
//! 2. **Failure responder** - classification and envelope shaping
//! 3. **User filters** - service-specific stages, in registration order
//! 4. **Handler** - the service operation
//!
//! The gateway and responder cannot be removed or reordered; user filters
//! always run inside both.

use std::str::FromStr;
use std::sync::Arc;

use keel_cache::MessageCache;
use keel_core::{KeelError, TransactionContext, TransactionId};
use keel_store::{ErrorRecorder, TraceRecorder};
use keel_telemetry::ServiceLogger;

use crate::classifier::FailureResponder;
use crate::filter::{BoxFuture, Filter, Next};
use crate::gateway::GatewayFilter;
use crate::types::{Request, Response, TRANSACTION_ID_HEADER};

const DEFAULT_CAPTURE_MAX_BYTES: usize = 64 * 1024;

/// The fixed-order filter pipeline.
pub struct Pipeline {
    gateway: GatewayFilter,
    responder: FailureResponder,
    filters: Vec<Arc<dyn Filter>>,
}

impl Pipeline {
    /// Creates a pipeline builder.
    #[must_use]
    pub fn builder(
        logger: ServiceLogger,
        messages: Arc<MessageCache>,
        traces: TraceRecorder,
        errors: ErrorRecorder,
    ) -> PipelineBuilder {
        PipelineBuilder {
            logger,
            messages,
            traces,
            errors,
            capture_max_bytes: DEFAULT_CAPTURE_MAX_BYTES,
            filters: Vec::new(),
        }
    }

    /// The names of all stages in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        let mut names = vec![self.gateway.name(), self.responder.name()];
        names.extend(self.filters.iter().map(|f| f.name()));
        names
    }

    /// Processes one request through the pipeline.
    ///
    /// The transaction id comes from the `x-request-id` header when it
    /// parses as a UUID, otherwise a fresh one is generated. The whole
    /// chain runs inside the transaction's ambient scope, and the id is
    /// echoed on the response.
    pub async fn process<H>(&self, request: Request, handler: H) -> Response
    where
        H: FnOnce(&Arc<TransactionContext>, Request) -> BoxFuture<'static, Result<Response, KeelError>>
            + Send
            + 'static,
    {
        let transaction_id = request
            .headers()
            .get(TRANSACTION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| TransactionId::from_str(value).ok())
            .unwrap_or_default();
        let ctx = Arc::new(TransactionContext::new(
            transaction_id,
            request.method().clone(),
            request.uri().path(),
        ));

        let scoped_ctx = ctx.clone();
        let mut response = TransactionContext::scope(ctx, async move {
            let mut next = Next::handler(handler);
            for filter in self.filters.iter().rev() {
                next = Next::new(filter.as_ref(), next);
            }
            next = Next::new(&self.responder, next);
            next = Next::new(&self.gateway, next);

            match next.run(&scoped_ctx, request).await {
                Ok(response) => response,
                // The responder converts every failure; this arm only runs
                // if the gateway itself fails.
                Err(err) => {
                    let envelope = keel_core::GenericResponse::failure(
                        scoped_ctx.transaction_id(),
                        scoped_ctx.path(),
                        err.to_string(),
                    );
                    crate::types::envelope_response(err.status_code(), &envelope)
                }
            }
        })
        .await;

        // Enveloped responses already carry the header; plain handler
        // responses get it stamped here.
        if !response.headers().contains_key(TRANSACTION_ID_HEADER) {
            if let Ok(value) = http::HeaderValue::from_str(&transaction_id.to_string()) {
                response.headers_mut().insert(TRANSACTION_ID_HEADER, value);
            }
        }
        response
    }
}

/// Builder for a [`Pipeline`].
pub struct PipelineBuilder {
    logger: ServiceLogger,
    messages: Arc<MessageCache>,
    traces: TraceRecorder,
    errors: ErrorRecorder,
    capture_max_bytes: usize,
    filters: Vec<Arc<dyn Filter>>,
}

impl PipelineBuilder {
    /// Caps the payload bytes retained per direction.
    #[must_use]
    pub fn capture_max_bytes(mut self, max_bytes: usize) -> Self {
        self.capture_max_bytes = max_bytes;
        self
    }

    /// Registers a user filter. Filters run in registration order, inside
    /// the gateway and responder.
    #[must_use]
    pub fn filter<F: Filter>(mut self, filter: F) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Finishes the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            gateway: GatewayFilter::new(
                self.logger.clone(),
                self.traces.clone(),
                self.capture_max_bytes,
            ),
            responder: FailureResponder::new(
                self.logger,
                self.messages,
                self.traces,
                self.errors,
            ),
            filters: self.filters,
        }
    }
}
