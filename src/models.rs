use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub amount: f64,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "current_timestamp")]
    pub date: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

// Captured per record, not once per process.
fn current_timestamp() -> String {
    Utc::now().to_rfc3339()
}

impl Expense {
    pub fn new(
        name: String,
        amount: f64,
        category: Option<String>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            id: None,
            name,
            amount,
            category: category.unwrap_or_else(default_category),
            date: current_timestamp(),
            user_id,
        }
    }

    /// Parses `date`, accepting RFC 3339 as well as the offset-less ISO form
    /// (`2024-03-01T12:30:00.123456`) older records were written with.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.date) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.date, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateExpenseRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
