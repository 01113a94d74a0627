//! Lookup caches over the message and param collections.
//!
//! Reads resolve against an immutable snapshot swapped in atomically, so a
//! reload in flight never blocks or tears a concurrent lookup. A failed
//! reload keeps the previous snapshot.

use std::sync::Arc;

use arc_swap::ArcSwap;
use keel_core::Task;
use metrics::{counter, describe_counter};
use keel_store::{Message, MessageStore, Param, ParamStore, StoreResult};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;

const RELOAD_FAILURES: &str = "keel_cache_reload_failures_total";

/// Registers descriptions for the cache metrics.
pub fn describe_cache_metrics() {
    describe_counter!(
        RELOAD_FAILURES,
        "Lookup cache reloads that failed and kept the previous snapshot"
    );
}

/// Lifecycle state of a lookup cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No load has completed yet.
    Initializing,
    /// The first load is in flight.
    Loading,
    /// The snapshot reflects a completed load.
    Ready,
    /// A refresh is in flight; reads keep serving the current snapshot.
    Reloading,
}

/// A snapshot-swapped collection cache.
#[derive(Debug)]
pub struct LookupCache<T> {
    snapshot: ArcSwap<Vec<T>>,
    state: Mutex<CacheState>,
}

impl<T> Default for LookupCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LookupCache<T> {
    /// Creates an empty cache in the initializing state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Vec::new()),
            state: Mutex::new(CacheState::Initializing),
        }
    }

    /// The current snapshot. Cheap; never blocks on a reload.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        self.snapshot.load_full()
    }

    /// The cache lifecycle state.
    #[must_use]
    pub fn state(&self) -> CacheState {
        *self.state.lock()
    }

    /// Installs a freshly loaded snapshot.
    pub fn install(&self, items: Vec<T>) {
        self.snapshot.store(Arc::new(items));
        *self.state.lock() = CacheState::Ready;
    }

    /// Marks a load as in flight.
    pub fn begin_load(&self) {
        let mut state = self.state.lock();
        *state = match *state {
            CacheState::Initializing | CacheState::Loading => CacheState::Loading,
            CacheState::Ready | CacheState::Reloading => CacheState::Reloading,
        };
    }

    /// Reverts a failed load to the last stable state.
    pub fn abort_load(&self) {
        let mut state = self.state.lock();
        *state = match *state {
            CacheState::Loading => CacheState::Initializing,
            CacheState::Reloading => CacheState::Ready,
            stable => stable,
        };
    }
}

/// A cache target the change feed can refresh.
#[async_trait::async_trait]
pub trait Reloadable: Send + Sync {
    /// Fetches the collection and swaps the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the fetch fails; the previous snapshot stays
    /// installed.
    async fn reload(&self) -> StoreResult<()>;
}

/// Well-known message keys with built-in fallback text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    /// Message when an operation completes.
    DefaultSuccess,
    /// Message when an operation fails without its own message.
    DefaultError,
    /// Message prefixing per-field validation errors.
    ValidationFieldError,
    /// Message when a requested key has no document.
    MessageNotFound,
}

impl MessageKey {
    /// The key this message resolves by.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKey::DefaultSuccess => "DEFAULT_SUCCESS",
            MessageKey::DefaultError => "DEFAULT_ERROR",
            MessageKey::ValidationFieldError => "VALIDATION_FIELD_ERROR",
            MessageKey::MessageNotFound => "MESSAGE_NOT_FOUND",
        }
    }

    /// Text used when neither the key nor the not-found sentinel resolves.
    #[must_use]
    pub fn fallback_text(self) -> &'static str {
        match self {
            MessageKey::DefaultSuccess => "Operation completed successfully.",
            MessageKey::DefaultError => "An unexpected error has occurred.",
            MessageKey::ValidationFieldError => "One or more fields are invalid.",
            MessageKey::MessageNotFound => "Message not found.",
        }
    }
}

/// The message collection cache.
pub struct MessageCache {
    store: Arc<dyn MessageStore>,
    cache: LookupCache<Message>,
}

impl MessageCache {
    /// Creates a cache over the given store. The snapshot starts empty;
    /// call [`Reloadable::reload`] to populate it.
    #[must_use]
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            store,
            cache: LookupCache::new(),
        }
    }

    /// The cache lifecycle state.
    #[must_use]
    pub fn state(&self) -> CacheState {
        self.cache.state()
    }

    /// Resolves a key to its message text.
    ///
    /// A missing key resolves to the not-found sentinel's text; a missing
    /// sentinel falls back to built-in text.
    #[must_use]
    pub fn resolve(&self, key: &str) -> String {
        let snapshot = self.cache.snapshot();
        if let Some(message) = snapshot.iter().find(|m| m.id == key) {
            return message.text.clone();
        }
        snapshot
            .iter()
            .find(|m| m.id == MessageKey::MessageNotFound.as_str())
            .map_or_else(
                || MessageKey::MessageNotFound.fallback_text().to_string(),
                |m| m.text.clone(),
            )
    }

    /// Resolves a well-known key, falling back to its built-in text.
    #[must_use]
    pub fn resolve_key(&self, key: MessageKey) -> String {
        let snapshot = self.cache.snapshot();
        snapshot
            .iter()
            .find(|m| m.id == key.as_str())
            .map_or_else(|| key.fallback_text().to_string(), |m| m.text.clone())
    }
}

#[async_trait::async_trait]
impl Reloadable for MessageCache {
    async fn reload(&self) -> StoreResult<()> {
        self.cache.begin_load();
        match self.store.fetch_all().await {
            Ok(messages) => {
                let count = messages.len();
                self.cache.install(messages);
                tracing::info!(
                    task = Task::message_cache_updated().id,
                    count,
                    "message cache refreshed"
                );
                Ok(())
            }
            Err(err) => {
                self.cache.abort_load();
                counter!(RELOAD_FAILURES, "cache" => "messages").increment(1);
                Err(err)
            }
        }
    }
}

/// The param collection cache.
pub struct ParamCache {
    store: Arc<dyn ParamStore>,
    cache: LookupCache<Param>,
}

impl ParamCache {
    /// Creates a cache over the given store. The snapshot starts empty;
    /// call [`Reloadable::reload`] to populate it.
    #[must_use]
    pub fn new(store: Arc<dyn ParamStore>) -> Self {
        Self {
            store,
            cache: LookupCache::new(),
        }
    }

    /// The cache lifecycle state.
    #[must_use]
    pub fn state(&self) -> CacheState {
        self.cache.state()
    }

    /// Resolves a key to a typed parameter value.
    ///
    /// Returns `None` when the key is absent or the value does not decode
    /// into the requested type.
    #[must_use]
    pub fn resolve<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let snapshot = self.cache.snapshot();
        let param = snapshot.iter().find(|p| p.id == key)?;
        serde_json::from_value(param.value.clone()).ok()
    }

    /// The raw JSON value for a key, when present.
    #[must_use]
    pub fn resolve_raw(&self, key: &str) -> Option<serde_json::Value> {
        let snapshot = self.cache.snapshot();
        snapshot.iter().find(|p| p.id == key).map(|p| p.value.clone())
    }
}

#[async_trait::async_trait]
impl Reloadable for ParamCache {
    async fn reload(&self) -> StoreResult<()> {
        self.cache.begin_load();
        match self.store.fetch_all().await {
            Ok(params) => {
                let count = params.len();
                self.cache.install(params);
                tracing::info!(
                    task = Task::param_cache_updated().id,
                    count,
                    "param cache refreshed"
                );
                Ok(())
            }
            Err(err) => {
                self.cache.abort_load();
                counter!(RELOAD_FAILURES, "cache" => "params").increment(1);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_store::InMemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_after_reload() {
        let store = InMemoryStore::new();
        store.put_messages(vec![Message::new("GREETING", "Hello.")], "messages");

        let cache = MessageCache::new(Arc::new(store));
        assert_eq!(cache.state(), CacheState::Initializing);

        cache.reload().await.unwrap();
        assert_eq!(cache.state(), CacheState::Ready);
        assert_eq!(cache.resolve("GREETING"), "Hello.");
    }

    #[tokio::test]
    async fn test_missing_key_resolves_not_found_sentinel() {
        let store = InMemoryStore::new();
        store.put_messages(
            vec![Message::new("MESSAGE_NOT_FOUND", "No such message.")],
            "messages",
        );

        let cache = MessageCache::new(Arc::new(store));
        cache.reload().await.unwrap();
        assert_eq!(cache.resolve("ABSENT"), "No such message.");
    }

    #[tokio::test]
    async fn test_missing_sentinel_uses_builtin_fallback() {
        let cache = MessageCache::new(Arc::new(InMemoryStore::new()));
        assert_eq!(
            cache.resolve("ABSENT"),
            MessageKey::MessageNotFound.fallback_text()
        );
    }

    #[tokio::test]
    async fn test_well_known_key_prefers_stored_text() {
        let store = InMemoryStore::new();
        store.put_messages(
            vec![Message::new("DEFAULT_ERROR", "Something went wrong.")],
            "messages",
        );

        let cache = MessageCache::new(Arc::new(store));
        cache.reload().await.unwrap();
        assert_eq!(
            cache.resolve_key(MessageKey::DefaultError),
            "Something went wrong."
        );
        assert_eq!(
            cache.resolve_key(MessageKey::DefaultSuccess),
            MessageKey::DefaultSuccess.fallback_text()
        );
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_snapshot() {
        let store = InMemoryStore::new();
        store.put_messages(vec![Message::new("GREETING", "Hello.")], "messages");

        let cache = MessageCache::new(Arc::new(store.clone()));
        cache.reload().await.unwrap();

        store.set_fail_fetches(true);
        assert!(cache.reload().await.is_err());
        assert_eq!(cache.state(), CacheState::Ready);
        assert_eq!(cache.resolve("GREETING"), "Hello.");
    }

    #[tokio::test]
    async fn test_param_resolves_typed_values() {
        let store = InMemoryStore::new();
        store.put_params(
            vec![
                Param::new("max_retries", json!(3)),
                Param::new("feature_flags", json!({"audit": true})),
            ],
            "params",
        );

        let cache = ParamCache::new(Arc::new(store));
        cache.reload().await.unwrap();

        assert_eq!(cache.resolve::<u32>("max_retries"), Some(3));
        assert!(cache.resolve::<String>("max_retries").is_none());
        assert!(cache.resolve::<u32>("absent").is_none());
        assert_eq!(
            cache.resolve_raw("feature_flags").unwrap()["audit"],
            json!(true)
        );
    }
}
