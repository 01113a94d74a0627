//! Change feed over lookup collections.
//!
//! Backends expose collection changes as a stream of [`ChangeEvent`]s. The
//! cache layer subscribes and reloads on every relevant event; it never
//! inspects the changed documents themselves.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// The kind of change a feed event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// A document was inserted.
    Insert,
    /// A document was updated in place.
    Update,
    /// A document was replaced.
    Replace,
    /// A document was deleted.
    Delete,
    /// Any operation the chassis does not react to.
    Other,
}

impl OperationType {
    /// Whether this operation changes lookup data and warrants a reload.
    #[must_use]
    pub fn is_relevant(self) -> bool {
        !matches!(self, OperationType::Other)
    }
}

/// One change observed on a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Kind of change.
    pub operation: OperationType,
    /// Collection the change occurred on.
    pub collection: String,
    /// The document after the change, when the backend surfaces it.
    pub document: Option<serde_json::Value>,
}

impl ChangeEvent {
    /// Creates a change event with no document payload.
    #[must_use]
    pub fn new(operation: OperationType, collection: impl Into<String>) -> Self {
        Self {
            operation,
            collection: collection.into(),
            document: None,
        }
    }

    /// Attaches the changed document.
    #[must_use]
    pub fn with_document(mut self, document: serde_json::Value) -> Self {
        self.document = Some(document);
        self
    }
}

/// A stream of collection changes. Ends when the backend connection drops.
pub type ChangeStream = BoxStream<'static, ChangeEvent>;

/// A source of collection change notifications.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Opens a new subscription to the named collection's changes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the subscription cannot be opened.
    async fn subscribe(&self, collection: &str) -> StoreResult<ChangeStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relevant_operations() {
        assert!(OperationType::Insert.is_relevant());
        assert!(OperationType::Update.is_relevant());
        assert!(OperationType::Replace.is_relevant());
        assert!(OperationType::Delete.is_relevant());
        assert!(!OperationType::Other.is_relevant());
    }

    #[test]
    fn test_operation_serialization() {
        let json = serde_json::to_string(&OperationType::Replace).unwrap();
        assert_eq!(json, "\"replace\"");
    }
}
