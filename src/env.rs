use std::path::Path;

use anyhow::{Context, anyhow};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Loads the layered env files and returns the ones that were found. Runs
/// before the tracing subscriber exists, so callers log the result.
pub fn load_environment() -> anyhow::Result<Vec<&'static str>> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".env"]
    };

    let mut loaded = Vec::new();
    for env_file in env_files {
        if load_env_file(env_file)? {
            loaded.push(env_file);
        }
    }

    Ok(loaded)
}

fn load_env_file(path: &str) -> anyhow::Result<bool> {
    if !Path::new(path).exists() {
        return Ok(false);
    }

    dotenvy::from_filename_override(path)
        .with_context(|| format!("Failed to load environment file {}", path))?;
    Ok(true)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// `DATABASE_URL` is mandatory; startup aborts without it.
    pub fn from_env() -> anyhow::Result<Self> {
        let url = dotenvy::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;

        let max_connections = match dotenvy::var("DATABASE_MAX_CONNECTIONS") {
            Ok(value) => value
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    anyhow!("DATABASE_MAX_CONNECTIONS must be a positive integer, got '{}'", value)
                })?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            url,
            max_connections,
        })
    }

    pub async fn connect(&self) -> Result<SqlitePool, sqlx::Error> {
        info!(max_connections = self.max_connections, "Connecting to database");
        SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.url)
            .await
    }
}
