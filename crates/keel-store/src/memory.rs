//! In-memory store implementation.
//!
//! Backs every persistence trait with process-local state and a broadcast
//! change feed. This is the implementation integration tests run against;
//! deployments plug in their own backend behind the same traits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use keel_core::{ServiceError, Traceability};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::{StoreError, StoreResult};
use crate::feed::{ChangeEvent, ChangeFeed, ChangeStream, OperationType};
use crate::store::{ErrorStore, Message, MessageStore, Param, ParamStore, TraceStore};

const FEED_CAPACITY: usize = 256;

/// Process-local store backing every persistence trait.
///
/// Cloning is cheap; clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    messages: Mutex<Vec<Message>>,
    params: Mutex<Vec<Param>>,
    traces: Mutex<Vec<Traceability>>,
    errors: Mutex<Vec<ServiceError>>,
    fail_fetches: AtomicBool,
    fail_inserts: AtomicBool,
    events: broadcast::Sender<ChangeEvent>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                messages: Mutex::new(Vec::new()),
                params: Mutex::new(Vec::new()),
                traces: Mutex::new(Vec::new()),
                errors: Mutex::new(Vec::new()),
                fail_fetches: AtomicBool::new(false),
                fail_inserts: AtomicBool::new(false),
                events,
            }),
        }
    }

    /// Replaces the message collection and emits a change event.
    pub fn put_messages(&self, messages: Vec<Message>, collection: &str) {
        *self.inner.messages.lock() = messages;
        self.emit(OperationType::Replace, collection);
    }

    /// Replaces the message collection without emitting a change event.
    pub fn set_messages(&self, messages: Vec<Message>) {
        *self.inner.messages.lock() = messages;
    }

    /// Replaces the param collection and emits a change event.
    pub fn put_params(&self, params: Vec<Param>, collection: &str) {
        *self.inner.params.lock() = params;
        self.emit(OperationType::Replace, collection);
    }

    /// Emits a change event without touching any collection.
    pub fn emit(&self, operation: OperationType, collection: &str) {
        // No subscribers is fine; the send result is intentionally ignored.
        let _ = self
            .inner
            .events
            .send(ChangeEvent::new(operation, collection));
    }

    /// Makes subsequent fetches fail until reset.
    pub fn set_fail_fetches(&self, fail: bool) {
        self.inner.fail_fetches.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent inserts fail until reset.
    pub fn set_fail_inserts(&self, fail: bool) {
        self.inner.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Recorded traceability records, oldest first.
    #[must_use]
    pub fn traces(&self) -> Vec<Traceability> {
        self.inner.traces.lock().clone()
    }

    /// Recorded service error records, oldest first.
    #[must_use]
    pub fn errors(&self) -> Vec<ServiceError> {
        self.inner.errors.lock().clone()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.inner.fail_fetches.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "fetch failure injected".to_string(),
            ));
        }
        Ok(())
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.inner.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected(
                "insert failure injected".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn fetch_all(&self) -> StoreResult<Vec<Message>> {
        self.check_available()?;
        Ok(self.inner.messages.lock().clone())
    }
}

#[async_trait]
impl ParamStore for InMemoryStore {
    async fn fetch_all(&self) -> StoreResult<Vec<Param>> {
        self.check_available()?;
        Ok(self.inner.params.lock().clone())
    }
}

#[async_trait]
impl TraceStore for InMemoryStore {
    async fn insert(&self, record: Traceability) -> StoreResult<()> {
        self.check_writable()?;
        self.inner.traces.lock().push(record);
        Ok(())
    }
}

#[async_trait]
impl ErrorStore for InMemoryStore {
    async fn insert(&self, record: ServiceError) -> StoreResult<()> {
        self.check_writable()?;
        self.inner.errors.lock().push(record);
        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for InMemoryStore {
    async fn subscribe(&self, collection: &str) -> StoreResult<ChangeStream> {
        let collection = collection.to_string();
        let rx = self.inner.events.subscribe();
        let stream = futures_util::stream::unfold(rx, move |mut rx| {
            let collection = collection.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(event) if event.collection == collection => {
                            return Some((event, rx));
                        }
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use keel_core::{LifecycleTask, TraceStatus, TransactionId};

    #[tokio::test]
    async fn test_fetch_returns_stored_documents() {
        let store = InMemoryStore::new();
        store.put_messages(
            vec![Message::new("DEFAULT_SUCCESS", "Operation complete.")],
            "messages",
        );

        let fetched = MessageStore::fetch_all(&store).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, "DEFAULT_SUCCESS");
    }

    #[tokio::test]
    async fn test_injected_fetch_failure() {
        let store = InMemoryStore::new();
        store.set_fail_fetches(true);
        assert!(MessageStore::fetch_all(&store).await.is_err());

        store.set_fail_fetches(false);
        assert!(MessageStore::fetch_all(&store).await.is_ok());
    }

    #[tokio::test]
    async fn test_trace_insert_is_recorded() {
        let store = InMemoryStore::new();
        let record = Traceability::builder(
            TransactionId::new(),
            TraceStatus::Success,
            LifecycleTask::StartRequest,
        )
        .build();
        TraceStore::insert(&store, record).await.unwrap();
        assert_eq!(store.traces().len(), 1);
    }

    #[tokio::test]
    async fn test_feed_delivers_only_subscribed_collection() {
        let store = InMemoryStore::new();
        let mut stream = ChangeFeed::subscribe(&store, "messages").await.unwrap();

        store.emit(OperationType::Insert, "params");
        store.emit(OperationType::Update, "messages");

        let event = stream.next().await.unwrap();
        assert_eq!(event.collection, "messages");
        assert_eq!(event.operation, OperationType::Update);
    }

    #[tokio::test]
    async fn test_feed_ends_when_store_dropped() {
        let store = InMemoryStore::new();
        let mut stream = ChangeFeed::subscribe(&store, "messages").await.unwrap();
        drop(store);
        assert!(stream.next().await.is_none());
    }
}
