use crate::store::firestore::{FirestoreConfig, DEFAULT_BASE_URL};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// JSON file on local disk
    File,
    /// Process memory, lost on exit
    Memory,
    /// Cloud Firestore REST API
    Firestore,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "server")]
#[command(about = "HTTP backend for the expense tracker", long_about = None)]
pub struct ServerConfig {
    #[arg(long, env = "EXPENSES_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "EXPENSES_PORT", default_value_t = 5000)]
    pub port: u16,

    #[arg(long, env = "EXPENSES_STORE", value_enum, default_value_t = StoreKind::File)]
    pub store: StoreKind,

    #[arg(long, env = "EXPENSES_DATA_FILE", default_value = "expenses.json")]
    pub data_file: PathBuf,

    #[arg(long, env = "FIRESTORE_PROJECT_ID")]
    pub firestore_project: Option<String>,

    #[arg(long, env = "FIRESTORE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub firestore_base_url: String,

    #[arg(long, env = "FIRESTORE_TOKEN", hide_env_values = true)]
    pub firestore_token: Option<String>,

    #[arg(long, env = "FIRESTORE_TOKEN_FILE")]
    pub firestore_token_file: Option<PathBuf>,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolves Firestore credentials. An inline token wins over a token file.
    pub fn firestore(&self) -> Result<FirestoreConfig> {
        let Some(project_id) = self.firestore_project.clone() else {
            bail!("FIRESTORE_PROJECT_ID is not set");
        };

        let token = match (&self.firestore_token, &self.firestore_token_file) {
            (Some(token), _) => token.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read token file {}", path.display()))?
                .trim()
                .to_string(),
            (None, None) => bail!("Neither FIRESTORE_TOKEN nor FIRESTORE_TOKEN_FILE is set"),
        };
        if token.is_empty() {
            bail!("Firestore token is empty");
        }

        Ok(FirestoreConfig {
            base_url: self.firestore_base_url.clone(),
            project_id,
            token,
        })
    }
}

#[derive(Debug, Clone, Args)]
pub struct DashboardConfig {
    #[arg(long, env = "EXPENSES_API_URL", default_value = "http://localhost:5000/api", global = true)]
    pub api_url: String,
}
