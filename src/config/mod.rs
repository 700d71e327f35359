use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

/// Configuration for the application, read from the process environment
/// (with `.env` support).
#[derive(Debug, Deserialize)]
pub struct Config {
    /// SQLite connection URL, e.g. `sqlite://fatura.db`.
    pub database_url: String,

    /// Directory rendered invoice artifacts are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// SMTP settings; sending is unavailable until all of host, username
    /// and password are present.
    pub smtp_host: Option<String>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    #[serde(default = "default_smtp_from")]
    pub smtp_from: String,
}

fn default_output_dir() -> String {
    "invoices".to_string()
}

fn default_smtp_from() -> String {
    "invoices@localhost".to_string()
}

impl Config {
    /// Load configuration from environment variables, reading `.env` first
    /// if it exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();
        let config = envy::from_env::<Config>()?;
        Ok(config)
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Initialize environment variables and load configuration.
pub fn init() -> Result<Config> {
    dotenv().ok();
    Config::load()
}
