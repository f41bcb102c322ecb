use crate::error::StoreError;
use crate::models::Expense;
use crate::store::{Document, DocumentStore, RemoveOutcome, StoredDocument};
use serde_json::Value;
use std::sync::Arc;

pub const EXPENSES_COLLECTION: &str = "expenses";

/// Expense operations on top of a document store.
///
/// The store is optional: a process whose connection attempt failed still
/// gets an `ExpenseStorage`, and every call on it reports
/// [`StoreError::Unavailable`].
#[derive(Clone)]
pub struct ExpenseStorage {
    store: Option<Arc<dyn DocumentStore>>,
}

impl ExpenseStorage {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn disconnected() -> Self {
        Self { store: None }
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    fn store(&self) -> Result<&Arc<dyn DocumentStore>, StoreError> {
        self.store
            .as_ref()
            .ok_or(StoreError::Unavailable { detail: None })
    }

    pub async fn list_all(&self) -> Result<Vec<Expense>, StoreError> {
        let documents = self
            .store()?
            .list(EXPENSES_COLLECTION)
            .await
            .map_err(StoreError::unavailable)?;

        let mut expenses = Vec::with_capacity(documents.len());
        for doc in documents {
            match into_expense(doc) {
                Ok(expense) => expenses.push(expense),
                Err((id, e)) => {
                    tracing::warn!("Skipping malformed expense document {}: {}", id, e);
                }
            }
        }
        Ok(expenses)
    }

    /// Stores `expense` and returns the id the store assigned. Any `id` already
    /// on the record is ignored.
    pub async fn create(&self, expense: Expense) -> Result<String, StoreError> {
        let store = self.store()?;
        validate(&expense)?;

        let mut document = to_document(&expense)?;
        document.remove("id");

        let id = store
            .insert(EXPENSES_COLLECTION, document)
            .await
            .map_err(StoreError::unavailable)?;
        tracing::info!(%id, category = %expense.category, "Created expense");
        Ok(id)
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let outcome = self
            .store()?
            .remove(EXPENSES_COLLECTION, id)
            .await
            .map_err(StoreError::unavailable)?;

        match outcome {
            RemoveOutcome::Removed => {
                tracing::info!(%id, "Deleted expense");
                Ok(())
            }
            RemoveOutcome::Missing => Err(StoreError::NotFound { id: id.to_string() }),
        }
    }
}

fn validate(expense: &Expense) -> Result<(), StoreError> {
    if expense.name.trim().is_empty() {
        return Err(StoreError::validation("name cannot be empty"));
    }
    if !expense.amount.is_finite() || expense.amount <= 0.0 {
        return Err(StoreError::validation("amount must be a positive number"));
    }
    Ok(())
}

fn to_document(expense: &Expense) -> Result<Document, StoreError> {
    match serde_json::to_value(expense) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::validation(format!(
            "expense serialized to a non-object: {}",
            other
        ))),
        Err(e) => Err(StoreError::validation(e.to_string())),
    }
}

fn into_expense(doc: StoredDocument) -> Result<Expense, (String, serde_json::Error)> {
    let StoredDocument { id, mut fields } = doc;
    fields.insert("id".to_string(), Value::String(id.clone()));
    serde_json::from_value(Value::Object(fields)).map_err(|e| (id, e))
}
