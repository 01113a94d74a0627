//! The boundary event logger.
//!
//! [`ServiceLogger`] emits the structured log lines the chassis produces at
//! request entry, request exit, and failure handling. Every line carries the
//! same field set, with the transaction id and origin resolved from the
//! ambient [`TransactionContext`] so call sites never thread them by hand.

use keel_core::{LogLevel, Task, TransactionContext};
use serde_json::Value;

/// Emits structured boundary event logs.
#[derive(Debug, Clone)]
pub struct ServiceLogger {
    application_name: String,
}

impl ServiceLogger {
    /// Creates a logger for the named application.
    #[must_use]
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
        }
    }

    /// The name this logger identifies the service by.
    #[must_use]
    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    /// Emits one boundary event.
    ///
    /// The transaction id resolves from the ambient context; outside a
    /// request scope it renders as `n/a`. The payload, when present, is
    /// rendered as compact JSON.
    pub fn log(
        &self,
        level: LogLevel,
        task: &Task,
        message: &str,
        payload: Option<&Value>,
        processing_time_millis: Option<u64>,
    ) {
        let context = TransactionContext::current();
        let transaction_id = context
            .as_ref()
            .map_or_else(|| "n/a".to_string(), |c| c.transaction_id().to_string());
        let log_origin = context.as_ref().map_or("", |c| c.path()).to_string();
        self.emit(
            level,
            task,
            message,
            payload,
            processing_time_millis,
            &transaction_id,
            &log_origin,
        );
    }

    /// Emits one boundary event against an explicit context.
    ///
    /// Used where the ambient scope has already ended, such as when a
    /// response body finishes streaming.
    pub fn log_in(
        &self,
        ctx: &TransactionContext,
        level: LogLevel,
        task: &Task,
        message: &str,
        payload: Option<&Value>,
        processing_time_millis: Option<u64>,
    ) {
        self.emit(
            level,
            task,
            message,
            payload,
            processing_time_millis,
            &ctx.transaction_id().to_string(),
            ctx.path(),
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        level: LogLevel,
        task: &Task,
        message: &str,
        payload: Option<&Value>,
        processing_time_millis: Option<u64>,
        transaction_id: &str,
        log_origin: &str,
    ) {
        let payload = payload.map(Value::to_string).unwrap_or_default();

        match level {
            LogLevel::Info => tracing::info!(
                application = %self.application_name,
                task = task.id,
                transaction_id = %transaction_id,
                origin = %log_origin,
                payload = %payload,
                duration_ms = processing_time_millis,
                "{message}"
            ),
            LogLevel::Warn => tracing::warn!(
                application = %self.application_name,
                task = task.id,
                transaction_id = %transaction_id,
                origin = %log_origin,
                payload = %payload,
                duration_ms = processing_time_millis,
                "{message}"
            ),
            LogLevel::Error => tracing::error!(
                application = %self.application_name,
                task = task.id,
                transaction_id = %transaction_id,
                origin = %log_origin,
                payload = %payload,
                duration_ms = processing_time_millis,
                "{message}"
            ),
        }
    }

    /// Emits a routine event.
    pub fn info(&self, task: &Task, message: &str) {
        self.log(LogLevel::Info, task, message, None, None);
    }

    /// Emits an expected-failure event.
    pub fn warn(&self, task: &Task, message: &str) {
        self.log(LogLevel::Warn, task, message, None, None);
    }

    /// Emits an unexpected-failure event.
    pub fn error(&self, task: &Task, message: &str) {
        self.log(LogLevel::Error, task, message, None, None);
    }

    /// The severity an exit event is logged at for a response status.
    ///
    /// Successful statuses log routinely, caller errors log as expected
    /// failures, and everything else is unexpected.
    #[must_use]
    pub fn exit_level(status: http::StatusCode) -> LogLevel {
        if status.is_success() {
            LogLevel::Info
        } else if status.is_client_error() {
            LogLevel::Warn
        } else {
            LogLevel::Error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_logging_outside_request_scope_does_not_panic() {
        let logger = ServiceLogger::new("test-service");
        logger.info(&Task::init_service(), "service started");
        logger.warn(&Task::exception_manager(), "handled failure");
        logger.error(&Task::exception_manager(), "unhandled failure");
    }

    #[tokio::test]
    async fn test_logging_inside_request_scope() {
        let ctx = Arc::new(TransactionContext::new(
            keel_core::TransactionId::new(),
            http::Method::GET,
            "/api/v1/mock",
        ));
        TransactionContext::scope(ctx, async {
            let logger = ServiceLogger::new("test-service");
            logger.log(
                LogLevel::Info,
                &Task::http_request_filter(),
                "request received",
                Some(&serde_json::json!({"body": "{}"})),
                Some(12),
            );
        })
        .await;
    }

    #[test]
    fn test_exit_level_by_status() {
        assert_eq!(
            ServiceLogger::exit_level(http::StatusCode::OK),
            LogLevel::Info
        );
        assert_eq!(
            ServiceLogger::exit_level(http::StatusCode::CONFLICT),
            LogLevel::Warn
        );
        assert_eq!(
            ServiceLogger::exit_level(http::StatusCode::INTERNAL_SERVER_ERROR),
            LogLevel::Error
        );
    }
}
