use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub appdir: Option<String>,
    #[serde(default)]
    pub dbdir: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tmdb: TmdbConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub tlscert: Option<String>,
    #[serde(default)]
    pub tlskey: Option<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
            tlscert: None,
            tlskey: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub sqlite: Option<SqliteConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbConfig {
    #[serde(alias = "baseurl", rename = "baseUrl")]
    #[serde(default = "default_tmdb_base_url")]
    pub base_url: String,
    /// Bearer token. Only used when the environment variable is unset.
    #[serde(alias = "apikey", rename = "apiKey")]
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(alias = "apikeyenv", rename = "apiKeyEnv")]
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(alias = "timeoutsecs", rename = "timeoutSecs")]
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            base_url: default_tmdb_base_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_secs: None,
        }
    }
}

impl TmdbConfig {
    /// Resolve the bearer token, environment first.
    pub fn token(&self) -> Result<String, ConfigError> {
        if let Ok(token) = std::env::var(&self.api_key_env) {
            if !token.trim().is_empty() {
                return Ok(token.trim().to_string());
            }
        }

        self.api_key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::MissingToken(self.api_key_env.clone()))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(alias = "debouncems", rename = "debounceMs")]
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(alias = "trendinglimit", rename = "trendingLimit")]
    #[serde(default = "default_trending_limit")]
    pub trending_limit: u32,
    #[serde(alias = "sessionttl", rename = "sessionTtl")]
    #[serde(default = "default_session_ttl")]
    pub session_ttl: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            trending_limit: default_trending_limit(),
            session_ttl: default_session_ttl(),
        }
    }
}

impl SearchConfig {
    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl)
    }
}

fn default_port() -> String {
    "8097".to_string()
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_api_key_env() -> String {
    "TMDB_API_KEY".to_string()
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_trending_limit() -> u32 {
    5
}

fn default_session_ttl() -> u64 {
    1800
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        Self::from_yaml(&content).map_err(|e| ConfigError::ParseError(path.to_string(), e))
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn get_database_path(&self) -> Option<String> {
        if let Some(ref sqlite) = self.database.sqlite {
            return Some(sqlite.filename.clone());
        }

        if let Some(ref dbdir) = self.dbdir {
            let path = PathBuf::from(dbdir).join("cinefind.db");
            return Some(path.to_string_lossy().to_string());
        }

        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
    #[error("No TMDB API token: set ${0} or tmdb.apiKey")]
    MissingToken(String),
}
