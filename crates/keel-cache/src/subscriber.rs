//! Change feed subscription loop.
//!
//! One subscriber task owns one cache. It reloads the cache on every
//! relevant feed event, keeps the subscription alive through reload
//! failures, and resubscribes with capped exponential backoff when the
//! stream ends or cannot be opened.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use keel_core::CacheConfig;
use keel_store::ChangeFeed;
use tokio::task::JoinHandle;

use crate::cache::Reloadable;

/// Spawns the subscriber task for one cache and collection.
///
/// The task runs until aborted. It performs an initial reload before the
/// first subscription, so the cache serves data even if no change ever
/// arrives.
pub fn spawn_subscriber(
    feed: Arc<dyn ChangeFeed>,
    target: Arc<dyn Reloadable>,
    collection: impl Into<String>,
    config: CacheConfig,
) -> JoinHandle<()> {
    let collection = collection.into();
    tokio::spawn(async move {
        let initial = Duration::from_millis(config.resubscribe_initial_millis);
        let max = Duration::from_millis(config.resubscribe_max_millis);

        if let Err(err) = target.reload().await {
            tracing::warn!(collection = %collection, error = %err, "initial cache load failed");
        }

        let mut delay = initial;
        loop {
            match feed.subscribe(&collection).await {
                Ok(mut stream) => {
                    delay = initial;
                    while let Some(event) = stream.next().await {
                        if !event.operation.is_relevant() {
                            continue;
                        }
                        if let Err(err) = target.reload().await {
                            tracing::warn!(
                                collection = %collection,
                                error = %err,
                                "cache reload failed; keeping previous snapshot"
                            );
                        }
                    }
                    tracing::warn!(collection = %collection, "change feed ended; resubscribing");
                }
                Err(err) => {
                    tracing::warn!(collection = %collection, error = %err, "change feed subscription failed");
                }
            }
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(max);
        }
    })
}
