use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Length in bytes of the AES-256 key.
pub const KEY_LEN: usize = 32;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub cipher: CipherConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// Base address of the Ollama server, e.g. `http://localhost:11434`.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            name: default_model_name(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model_name() -> String {
    "mistral".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct CipherConfig {
    /// Hex-encoded 256-bit key. Filled from `key_env` when absent.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_key_env")]
    pub key_env: String,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            key: None,
            key_env: default_key_env(),
        }
    }
}

fn default_key_env() -> String {
    "DOCDIGEST_SECRET_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_limit")]
    pub default_limit: i64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_history_limit(),
        }
    }
}

fn default_history_limit() -> i64 {
    50
}

impl Config {
    /// Builds a config around a database path with every other section defaulted.
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig { path: path.into() },
            model: ModelConfig::default(),
            cipher: CipherConfig::default(),
            server: ServerConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // An inline key wins; otherwise read the configured variable once, here.
    if config.cipher.key.is_none() {
        config.cipher.key = std::env::var(&config.cipher.key_env)
            .ok()
            .filter(|v| !v.trim().is_empty());
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if let Some(ref key) = config.cipher.key {
        let bytes = hex::decode(key.trim())
            .map_err(|_| anyhow::anyhow!("cipher.key must be hex-encoded"))?;
        if bytes.len() != KEY_LEN {
            anyhow::bail!(
                "cipher.key must be {} hex characters ({} bytes), got {} bytes",
                KEY_LEN * 2,
                KEY_LEN,
                bytes.len()
            );
        }
    }

    if let Some(ref url) = config.model.base_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("model.base_url must start with http:// or https://");
        }
    }

    if config.model.timeout_secs == 0 {
        anyhow::bail!("model.timeout_secs must be > 0");
    }

    if config.history.default_limit < 1 {
        anyhow::bail!("history.default_limit must be >= 1");
    }

    if config.server.max_upload_bytes == 0 {
        anyhow::bail!("server.max_upload_bytes must be > 0");
    }

    Ok(())
}
