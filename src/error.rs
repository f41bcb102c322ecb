use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{}", unavailable_message(.detail))]
    Unavailable { detail: Option<String> },

    #[error("invalid expense: {detail}")]
    ValidationFailure { detail: String },

    #[error("expense not found: {id}")]
    NotFound { id: String },
}

fn unavailable_message(detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!("document store unavailable: {}", detail),
        None => "document store not initialized".to_string(),
    }
}

impl StoreError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        StoreError::Unavailable {
            detail: Some(format!("{:#}", err)),
        }
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        StoreError::ValidationFailure {
            detail: detail.into(),
        }
    }
}
