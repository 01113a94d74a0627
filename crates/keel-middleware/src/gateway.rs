//! The boundary filter.
//!
//! [`GatewayFilter`] is the outermost stage. It joins the request body into
//! one buffer and replays it downstream, records the start-of-request
//! traceability checkpoint with the captured payload, tees the response
//! body through a capture buffer, and arranges for exactly one
//! end-of-request checkpoint and exit log no matter how the request ends: a
//! streamed-out response, a handled failure, or a client that walked away
//! mid-stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use http::StatusCode;
use http_body_util::BodyExt;
use keel_core::{
    KeelError, LifecycleTask, LogLevel, Task, TraceStatus, Traceability, TransactionContext,
};
use keel_store::TraceRecorder;
use keel_telemetry::ServiceLogger;
use parking_lot::Mutex;

use crate::capture::{CaptureBody, CaptureBuffer};
use crate::filter::{BoxFuture, Filter, Next};
use crate::types::{full_body, Request, Response};

/// Fires the end-of-request checkpoint exactly once.
///
/// Held by the response body's completion hook. If the body (or the whole
/// request future) is dropped before the stream ends, the guard still fires
/// from `Drop`. A request cancelled before any response head exists has no
/// status to record and classifies as an unexpected failure.
pub(crate) struct Completion {
    ctx: Arc<TransactionContext>,
    logger: ServiceLogger,
    traces: TraceRecorder,
    request_buffer: Arc<CaptureBuffer>,
    response_buffer: Arc<CaptureBuffer>,
    status: Mutex<Option<StatusCode>>,
    fired: AtomicBool,
}

impl Completion {
    fn new(
        ctx: Arc<TransactionContext>,
        logger: ServiceLogger,
        traces: TraceRecorder,
        request_buffer: Arc<CaptureBuffer>,
        response_buffer: Arc<CaptureBuffer>,
    ) -> Self {
        Self {
            ctx,
            logger,
            traces,
            request_buffer,
            response_buffer,
            status: Mutex::new(None),
            fired: AtomicBool::new(false),
        }
    }

    fn set_status(&self, status: StatusCode) {
        *self.status.lock() = Some(status);
    }

    pub(crate) fn fire(&self) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }

        let duration = u64::try_from(self.ctx.elapsed().as_millis()).unwrap_or(u64::MAX);
        let status = *self.status.lock();
        // A request that produced a response without carrying a failure
        // classification ended successfully, whatever its status code; only
        // a request abandoned before its response head counts as an error.
        let trace_status = self.ctx.trace_status().unwrap_or(match status {
            Some(_) => TraceStatus::Success,
            None => TraceStatus::Error,
        });
        let level = status.map_or(LogLevel::Error, ServiceLogger::exit_level);

        let mut record = Traceability::builder(
            self.ctx.transaction_id(),
            trace_status,
            LifecycleTask::EndRequest,
        )
        .origin(self.ctx.path())
        .method(self.ctx.method().clone())
        .request(self.request_buffer.snapshot())
        .duration_millis(duration);
        if self.response_buffer.is_complete() {
            record = record.response(self.response_buffer.snapshot());
        }
        self.traces.record(record.build());

        let payload = serde_json::json!({
            "status": status.map(|s| s.as_u16()),
            "responseComplete": self.response_buffer.is_complete(),
        });
        let message = match status {
            Some(_) => "request completed",
            None => "request abandoned before completion",
        };
        self.logger.log_in(
            &self.ctx,
            level,
            &Task::http_response_filter(),
            message,
            Some(&payload),
            Some(duration),
        );
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.fire();
    }
}

/// The boundary filter. Outermost stage of every chain.
pub struct GatewayFilter {
    logger: ServiceLogger,
    traces: TraceRecorder,
    capture_max_bytes: usize,
}

impl GatewayFilter {
    /// Creates the boundary filter.
    #[must_use]
    pub fn new(logger: ServiceLogger, traces: TraceRecorder, capture_max_bytes: usize) -> Self {
        Self {
            logger,
            traces,
            capture_max_bytes,
        }
    }
}

impl Filter for GatewayFilter {
    fn name(&self) -> &'static str {
        "gateway"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a Arc<TransactionContext>,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Response, KeelError>> {
        Box::pin(async move {
            let request_buffer = Arc::new(CaptureBuffer::new(self.capture_max_bytes));
            let response_buffer = Arc::new(CaptureBuffer::new(self.capture_max_bytes));

            // The request body is joined up front so downstream stages see a
            // replayable buffer and the start checkpoint carries the payload.
            let (parts, body) = request.into_parts();
            let bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };
            request_buffer.push(&bytes);
            request_buffer.mark_complete();
            ctx.set_request_payload(request_buffer.snapshot());
            let request = Request::from_parts(parts, full_body(bytes));

            self.traces.record(
                Traceability::builder(
                    ctx.transaction_id(),
                    TraceStatus::Success,
                    LifecycleTask::StartRequest,
                )
                .origin(ctx.path())
                .method(ctx.method().clone())
                .request(request_buffer.snapshot())
                .build(),
            );
            self.logger.log(
                LogLevel::Info,
                &Task::http_request_filter(),
                "request received",
                Some(&serde_json::json!({ "body": request_buffer.snapshot() })),
                None,
            );

            let completion = Arc::new(Completion::new(
                ctx.clone(),
                self.logger.clone(),
                self.traces.clone(),
                request_buffer,
                response_buffer.clone(),
            ));

            let response = next.run(ctx, request).await?;
            completion.set_status(response.status());

            let hook = completion.clone();
            let response = response.map(move |body| {
                CaptureBody::new(body, response_buffer.clone())
                    .on_complete(move || hook.fire())
                    .boxed()
            });
            drop(completion);
            Ok(response)
        })
    }
}
