//! Persistence traits and lookup document types.
//!
//! The chassis reads two lookup collections (messages and params) and writes
//! two audit collections (traceability and service errors). Each concern is
//! one trait, so backends stay swappable and tests run against the in-memory
//! implementation.

use async_trait::async_trait;
use keel_core::{ServiceError, Traceability};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreResult;

/// A human-readable message document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Key the message resolves by.
    pub id: String,
    /// Operator-facing note on what the message is for.
    #[serde(default)]
    pub description: String,
    /// Resolved text.
    pub text: String,
}

impl Message {
    /// Creates a message document with an empty description.
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            text: text.into(),
        }
    }

    /// Sets the operator-facing description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// An operational parameter document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Key the parameter resolves by.
    pub id: String,
    /// Operator-facing note on what the parameter controls.
    #[serde(default)]
    pub description: String,
    /// Whether the parameter is active.
    #[serde(default = "default_param_status")]
    pub status: bool,
    /// Arbitrary JSON value.
    pub value: Value,
}

fn default_param_status() -> bool {
    true
}

impl Param {
    /// Creates an active parameter document with an empty description.
    #[must_use]
    pub fn new(id: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            status: true,
            value,
        }
    }

    /// Sets the operator-facing description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Marks the parameter inactive.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.status = false;
        self
    }
}

/// Read access to the message collection.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Fetches every message document.
    async fn fetch_all(&self) -> StoreResult<Vec<Message>>;
}

/// Read access to the param collection.
#[async_trait]
pub trait ParamStore: Send + Sync {
    /// Fetches every parameter document.
    async fn fetch_all(&self) -> StoreResult<Vec<Param>>;
}

/// Write access to the traceability collection.
#[async_trait]
pub trait TraceStore: Send + Sync {
    /// Inserts one traceability record.
    async fn insert(&self, record: Traceability) -> StoreResult<()>;
}

/// Write access to the service error collection.
#[async_trait]
pub trait ErrorStore: Send + Sync {
    /// Inserts one service error record.
    async fn insert(&self, record: ServiceError) -> StoreResult<()>;
}
