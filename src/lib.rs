pub mod api;
pub mod category;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod storage;
pub mod store;
pub mod summary;

pub use category::{normalize, Category};
pub use error::StoreError;
pub use models::Expense;
pub use storage::ExpenseStorage;
