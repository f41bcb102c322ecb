use anyhow::{Context, Result};
use clap::Parser;
use expense_tracker::api::build_router;
use expense_tracker::config::{ServerConfig, StoreKind};
use expense_tracker::storage::{ExpenseStorage, EXPENSES_COLLECTION};
use expense_tracker::store::{DocumentStore, FileStore, FirestoreStore, MemoryStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();

    // A failed connection leaves the server up, answering every request with
    // a store-unavailable error.
    let storage = match connect_store(&config).await {
        Ok(store) => {
            tracing::info!("Document store ready ({:?})", config.store);
            ExpenseStorage::new(store)
        }
        Err(e) => {
            tracing::error!("Failed to initialize document store: {:#}", e);
            ExpenseStorage::disconnected()
        }
    };

    let app = build_router(storage);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("💰 Expense tracker API running on http://{}", addr);
    tracing::info!("   GET    /api/expenses      - List expenses");
    tracing::info!("   POST   /api/expenses      - Add an expense");
    tracing::info!("   DELETE /api/expenses/:id  - Delete an expense");

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}

async fn connect_store(config: &ServerConfig) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.store {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::File => {
            tracing::info!("Opening store file {}", config.data_file.display());
            Arc::new(FileStore::open(&config.data_file)?)
        }
        StoreKind::Firestore => {
            let firestore = config.firestore()?;
            tracing::info!("Connecting to Firestore project {}", firestore.project_id);
            Arc::new(FirestoreStore::connect(firestore, EXPENSES_COLLECTION).await?)
        }
    };
    Ok(store)
}
