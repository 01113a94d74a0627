//! Fire-and-forget audit recorders.
//!
//! Requests never wait on audit writes. Each recorder hands records to a
//! background worker over an unbounded channel; the worker inserts them and
//! counts failures, so a broken store slows nothing down and loses nothing
//! silently.

use std::sync::Arc;

use keel_core::{ServiceError, Traceability};
use metrics::{counter, describe_counter};
use tokio::sync::mpsc;

use crate::store::{ErrorStore, TraceStore};

/// Registers descriptions for the recorder metrics.
pub fn describe_recorder_metrics() {
    describe_counter!(
        "keel_audit_records_total",
        "Total audit records accepted for writing"
    );
    describe_counter!(
        "keel_audit_record_failures_total",
        "Total audit records that failed to persist"
    );
}

/// Hands traceability records to a background writer.
///
/// Cloning is cheap; clones feed the same worker.
#[derive(Debug, Clone)]
pub struct TraceRecorder {
    tx: mpsc::UnboundedSender<Traceability>,
}

impl TraceRecorder {
    /// Spawns the writer worker and returns its handle.
    #[must_use]
    pub fn spawn(store: Arc<dyn TraceStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Traceability>();
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                counter!("keel_audit_records_total", "kind" => "traceability").increment(1);
                if let Err(err) = store.insert(record).await {
                    counter!("keel_audit_record_failures_total", "kind" => "traceability")
                        .increment(1);
                    tracing::warn!(error = %err, "failed to persist traceability record");
                }
            }
        });
        Self { tx }
    }

    /// Queues one record. Never blocks and never fails the caller.
    pub fn record(&self, record: Traceability) {
        if self.tx.send(record).is_err() {
            counter!("keel_audit_record_failures_total", "kind" => "traceability").increment(1);
            tracing::warn!("traceability writer is gone; record dropped");
        }
    }
}

/// Hands service error records to a background writer.
#[derive(Debug, Clone)]
pub struct ErrorRecorder {
    tx: mpsc::UnboundedSender<ServiceError>,
}

impl ErrorRecorder {
    /// Spawns the writer worker and returns its handle.
    #[must_use]
    pub fn spawn(store: Arc<dyn ErrorStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServiceError>();
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                counter!("keel_audit_records_total", "kind" => "service_error").increment(1);
                if let Err(err) = store.insert(record).await {
                    counter!("keel_audit_record_failures_total", "kind" => "service_error")
                        .increment(1);
                    tracing::warn!(error = %err, "failed to persist service error record");
                }
            }
        });
        Self { tx }
    }

    /// Queues one record. Never blocks and never fails the caller.
    pub fn record(&self, record: ServiceError) {
        if self.tx.send(record).is_err() {
            counter!("keel_audit_record_failures_total", "kind" => "service_error").increment(1);
            tracing::warn!("service error writer is gone; record dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use keel_core::{LifecycleTask, Task, TraceStatus, TransactionId};
    use std::time::Duration;

    fn sample_trace() -> Traceability {
        Traceability::builder(
            TransactionId::new(),
            TraceStatus::Success,
            LifecycleTask::StartRequest,
        )
        .origin("/api/v1/mock")
        .build()
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_trace_records_reach_the_store() {
        let store = InMemoryStore::new();
        let recorder = TraceRecorder::spawn(Arc::new(store.clone()));

        recorder.record(sample_trace());
        recorder.record(sample_trace());

        wait_for(|| store.traces().len() == 2).await;
    }

    #[tokio::test]
    async fn test_error_records_reach_the_store() {
        let store = InMemoryStore::new();
        let recorder = ErrorRecorder::spawn(Arc::new(store.clone()));

        let record = ServiceError::builder(TransactionId::new(), Task::exception_manager())
            .message("boom")
            .build();
        recorder.record(record);

        wait_for(|| store.errors().len() == 1).await;
        assert_eq!(store.errors()[0].message, "boom");
    }

    #[tokio::test]
    async fn test_worker_survives_insert_failures() {
        let store = InMemoryStore::new();
        let recorder = TraceRecorder::spawn(Arc::new(store.clone()));

        store.set_fail_inserts(true);
        recorder.record(sample_trace());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.traces().is_empty());

        store.set_fail_inserts(false);
        recorder.record(sample_trace());
        wait_for(|| store.traces().len() == 1).await;
    }
}
