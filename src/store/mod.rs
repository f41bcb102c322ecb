pub mod file;
pub mod firestore;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub use file::FileStore;
pub use firestore::{FirestoreConfig, FirestoreStore};
pub use memory::MemoryStore;

/// A schemaless document: field name to JSON value.
pub type Document = Map<String, Value>;

/// A document together with the id the store assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    Missing,
}

/// A collection-addressed document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document in the collection, in no particular order.
    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>>;

    /// Insert a document and return the id the store assigned.
    async fn insert(&self, collection: &str, document: Document) -> Result<String>;

    async fn remove(&self, collection: &str, id: &str) -> Result<RemoveOutcome>;
}
