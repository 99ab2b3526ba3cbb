//! Application configuration and database bootstrap

pub mod repository;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const APP_DIR: &str = "skillmatch";

/// Runtime configuration, read from `config.toml` and overridden by env vars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// sqlx connection string, e.g. `sqlite:///var/lib/skillmatch/skillmatch.db`
    pub database_url: String,
    /// Address the web server binds to
    pub bind: String,
    /// Root directory for uploaded company documents
    pub media_dir: PathBuf,
    pub max_connections: u32,
    /// Request body limit for multipart uploads
    pub max_upload_bytes: usize,
    /// Sessions older than this stop resolving and are purged
    pub session_max_age_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            database_url: format!("sqlite://{}", data_dir.join("skillmatch.db").display()),
            bind: "127.0.0.1:8000".to_string(),
            media_dir: data_dir.join("media"),
            max_connections: 5,
            max_upload_bytes: 10 * 1024 * 1024,
            session_max_age_secs: 14 * 24 * 60 * 60,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// `<config dir>/skillmatch/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

impl Config {
    /// Load configuration from an explicit path, the default path, or defaults.
    /// An explicit path that does not exist is an error; a missing default file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `SKILLMATCH_*` overrides from the environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SKILLMATCH_DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(bind) = lookup("SKILLMATCH_BIND") {
            self.bind = bind;
        }
        if let Some(dir) = lookup("SKILLMATCH_MEDIA_DIR") {
            self.media_dir = PathBuf::from(dir);
        }
    }
}

/// Open the connection pool and apply pending migrations
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .with_context(|| format!("Invalid database url: {}", config.database_url))?
        .create_if_missing(true)
        .foreign_keys(true);

    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .context("Failed to open database")?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Apply embedded migrations
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    log::info!("Database schema is up to date");
    Ok(())
}

/// Single-connection in-memory pool with migrations applied
pub async fn memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    // The database lives only as long as its one connection
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .context("Failed to open in-memory database")?;
    migrate(&pool).await?;
    Ok(pool)
}
