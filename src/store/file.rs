use super::{Document, DocumentStore, RemoveOutcome, StoredDocument};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use uuid::Uuid;

type Collections = BTreeMap<String, BTreeMap<String, Document>>;

/// Persists every collection to a single pretty-printed JSON file, rewritten
/// after each mutation. The in-memory state only changes once the write has
/// succeeded.
pub struct FileStore {
    path: PathBuf,
    collections: RwLock<Collections>,
}

impl FileStore {
    /// Loads the file if it exists. A missing file is an empty store; an
    /// unreadable or malformed one is an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let collections = if path.exists() {
            let data = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store file {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("Failed to parse store file {}", path.display()))?
        } else {
            Collections::new()
        };

        Ok(Self {
            path,
            collections: RwLock::new(collections),
        })
    }

    fn save_to_disk(&self, collections: &Collections) -> Result<()> {
        let json =
            serde_json::to_string_pretty(collections).context("Failed to serialize documents")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write store file {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| StoredDocument {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        let mut collections = self.collections.write().await;
        let mut updated = collections.clone();
        updated
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), document);
        self.save_to_disk(&updated)?;
        *collections = updated;
        Ok(id)
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<RemoveOutcome> {
        let mut collections = self.collections.write().await;
        let mut updated = collections.clone();
        let removed = updated
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if !removed {
            return Ok(RemoveOutcome::Missing);
        }
        self.save_to_disk(&updated)?;
        *collections = updated;
        Ok(RemoveOutcome::Removed)
    }
}
