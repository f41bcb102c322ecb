use crate::category::Category;
use crate::models::{ErrorResponse, Expense, MessageResponse};
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The request never completed: refused connection, DNS failure, ...
    #[error("Could not connect to the server: {0}")]
    Connection(#[source] reqwest::Error),

    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("Unexpected response from the server: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct CreateExpenseBody<'a> {
    name: &'a str,
    amount: f64,
    category: &'a str,
}

/// Talks to the `/api` routes of the expense server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn expenses_url(&self) -> String {
        format!("{}/expenses", self.base_url)
    }

    pub async fn list_expenses(&self) -> Result<Vec<Expense>, ClientError> {
        let response = self
            .client
            .get(self.expenses_url())
            .send()
            .await
            .map_err(ClientError::Connection)?;

        check_status(response)
            .await?
            .json()
            .await
            .map_err(ClientError::Decode)
    }

    /// Returns the id the server assigned, when it reports one.
    pub async fn add_expense(
        &self,
        name: &str,
        amount: f64,
        category: Category,
    ) -> Result<Option<String>, ClientError> {
        let body = CreateExpenseBody {
            name,
            amount,
            category: category.as_str(),
        };
        let response = self
            .client
            .post(self.expenses_url())
            .json(&body)
            .send()
            .await
            .map_err(ClientError::Connection)?;

        let created: MessageResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(ClientError::Decode)?;
        Ok(created.id)
    }

    pub async fn delete_expense(&self, id: &str) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(format!("{}/{}", self.expenses_url(), id))
            .send()
            .await
            .map_err(ClientError::Connection)?;

        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(ClientError::Api {
        status,
        message: error_message(&text),
    })
}

/// The `error` field of a JSON error body, or the raw body text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_json_error() {
        assert_eq!(
            error_message(r#"{"error":"expense not found: abc"}"#),
            "expense not found: abc"
        );
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("http://localhost:5000/api/");
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        assert_eq!(client.expenses_url(), "http://localhost:5000/api/expenses");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(format!("http://{}/api", addr));
        let err = client.list_expenses().await.unwrap_err();
        assert!(matches!(err, ClientError::Connection(_)));
    }
}
