use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LLMConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub max_upload_bytes: usize,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string. Without one the server keeps everything in memory.
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub openai_api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl LLMConfig {
    /// The configured key, treating an empty value the same as an unset one.
    pub fn active_api_key(&self) -> Option<String> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub media_root: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            server: ServerConfig {
                port: var("PORT", "8001")
                    .parse()
                    .context("PORT must be a valid port number")?,
                host: var("HOST", "0.0.0.0"),
                max_upload_bytes: var("MAX_UPLOAD_BYTES", "52428800")
                    .parse()
                    .context("MAX_UPLOAD_BYTES must be a byte count")?,
                cors_allowed_origins: var("ALLOWED_ORIGINS", "*")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
                max_connections: var("DB_MAX_CONNECTIONS", "10")
                    .parse()
                    .context("DB_MAX_CONNECTIONS must be an integer")?,
                min_connections: var("DB_MIN_CONNECTIONS", "1")
                    .parse()
                    .context("DB_MIN_CONNECTIONS must be an integer")?,
            },
            llm: LLMConfig {
                openai_api_key: lookup("OPENAI_API_KEY"),
                api_base: var("OPENAI_API_BASE", DEFAULT_OPENAI_API_BASE),
                model: var("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
                timeout_secs: var("LLM_TIMEOUT_SECS", "60")
                    .parse()
                    .context("LLM_TIMEOUT_SECS must be a number of seconds")?,
            },
            storage: StorageConfig {
                media_root: PathBuf::from(var("MEDIA_ROOT", "media")),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server.port, 8001);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.cors_allowed_origins, vec!["*"]);
        assert!(config.database.url.is_none());
        assert_eq!(config.llm.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.llm.api_base, DEFAULT_OPENAI_API_BASE);
        assert_eq!(config.storage.media_root, PathBuf::from("media"));
        assert!(config.llm.active_api_key().is_none());
    }

    #[test]
    fn test_blank_api_key_is_inactive() {
        let config = config_from(&[("OPENAI_API_KEY", "   ")]).unwrap();
        assert!(config.llm.active_api_key().is_none());

        let config = config_from(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.llm.active_api_key().as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_allowed_origins_are_split() {
        let config = config_from(&[("ALLOWED_ORIGINS", "http://localhost:3000, http://localhost:5173,")]).unwrap();
        assert_eq!(
            config.server.cors_allowed_origins,
            vec!["http://localhost:3000", "http://localhost:5173"]
        );
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(config_from(&[("PORT", "not-a-port")]).is_err());
    }

    #[test]
    fn test_empty_database_url_means_memory() {
        let config = config_from(&[("DATABASE_URL", "")]).unwrap();
        assert!(config.database.url.is_none());
    }
}
