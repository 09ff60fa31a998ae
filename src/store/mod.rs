//! Document store boundary.
//!
//! The application persists everything through a realtime document database
//! exposing collection reads, single-document writes and an atomic multi-document
//! batch. `DocumentStore` captures exactly that surface so the business layer
//! never talks to a concrete backend directly.

pub mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

pub use memory::MemoryStore;

/// A stored document: a JSON object keyed by field name. Every document read
/// back from the store carries its own `id` field.
pub type Document = serde_json::Map<String, Value>;

/// Collection names persisted by the application.
pub mod collections {
    pub const TEAM: &str = "team";
    pub const TASKS: &str = "tasks";
    pub const GOALS: &str = "goals";
    pub const TODOS: &str = "todos";
    pub const TODO_LISTS: &str = "todoLists";
    pub const TODO_ITEMS: &str = "todoItems";
    pub const CALENDAR_EVENTS: &str = "calendarEvents";
    pub const AUDIT_LOGS: &str = "auditLogs";
    pub const CREDENTIALS: &str = "credentials";
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
}

/// Field-level filter for collection queries. Values are compared structurally.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value,
        }
    }

    pub fn ne(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Ne,
            value,
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        let field_value = doc.get(&self.field).unwrap_or(&Value::Null);
        match self.op {
            FilterOp::Eq => *field_value == self.value,
            FilterOp::Ne => *field_value != self.value,
        }
    }
}

/// One write inside an atomic batch: merge `data` into the document at
/// `collection/id`. All writes in a batch apply together or not at all.
#[derive(Debug, Clone)]
pub struct BatchWrite {
    pub collection: String,
    pub id: String,
    pub data: Document,
}

impl BatchWrite {
    pub fn new(collection: impl Into<String>, id: impl Into<String>, data: Document) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            data,
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List documents in a collection, optionally narrowed by filters.
    async fn list(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Insert a new document with a generated id; returns the id.
    async fn add(&self, collection: &str, data: Document) -> Result<String, StoreError>;

    /// Create or replace a document at a caller-chosen id.
    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError>;

    /// Merge `partial` into an existing document; fields absent from `partial`
    /// are left untouched.
    async fn update(&self, collection: &str, id: &str, partial: Document) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Apply every write or none. There is no partial commit: the store
    /// validates the whole batch before touching any document.
    async fn atomic_batch(&self, writes: Vec<BatchWrite>) -> Result<(), StoreError>;

    /// Subscribe to full-collection snapshots; a new snapshot is published
    /// after every mutation of the collection.
    fn subscribe(&self, collection: &str) -> broadcast::Receiver<Vec<Document>>;
}

/// Serialize a typed entity into a stored document.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Deserialize a stored document into a typed entity.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// Pull the mandatory `id` field out of a stored document.
pub fn document_id(doc: &Document) -> Result<&str, StoreError> {
    doc.get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::InvalidDocument("document has no id field".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_eq_and_ne() {
        let mut doc = Document::new();
        doc.insert("status".into(), json!("Completed"));

        assert!(Filter::eq("status", json!("Completed")).matches(&doc));
        assert!(!Filter::ne("status", json!("Completed")).matches(&doc));
        assert!(Filter::ne("status", json!("In Progress")).matches(&doc));
    }

    #[test]
    fn missing_field_compares_as_null() {
        let doc = Document::new();
        assert!(Filter::eq("assigneeId", Value::Null).matches(&doc));
        assert!(Filter::ne("assigneeId", json!("u1")).matches(&doc));
    }
}
