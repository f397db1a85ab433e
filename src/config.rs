use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OneiroConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub completion: CompletionConfig,
    pub embedding: EmbeddingConfig,
    pub auth: AuthConfig,
    pub enrichment: EnrichmentConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    pub api_key: String,
    /// Model for one-shot text completions (analysis, summaries).
    pub text_model: String,
    /// Model for multi-turn chat and function-calling.
    pub chat_model: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// Public JSON key set of the identity provider.
    pub jwks_url: String,
    /// Expected `aud` claim.
    pub audience: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    /// Regenerate analysis/imagery even when the dream already carries one.
    pub force_regenerate: bool,
    /// Analysis depth: simplified, general, detailed, expert, research.
    pub intelligence_level: String,
    pub default_style: String,
    pub default_quality: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    /// Per-user cap on retained history messages; oldest are evicted.
    pub history_limit: usize,
}

impl Default for OneiroConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            completion: CompletionConfig::default(),
            embedding: EmbeddingConfig::default(),
            auth: AuthConfig::default(),
            enrichment: EnrichmentConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_oneiro_dir()
            .join("dreams.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: String::new(),
            text_model: "gpt-3.5-turbo".into(),
            chat_model: "gpt-3.5-turbo-16k".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "remote".into(),
            model: "text-embedding-3-small".into(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwks_url: "https://appleid.apple.com/auth/keys".into(),
            audience: "com.oneiro.journal".into(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay_secs: 5,
            force_regenerate: true,
            intelligence_level: "general".into(),
            default_style: "renaissance".into(),
            default_quality: "low".into(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { history_limit: 100 }
    }
}

/// Returns `~/.oneiro/`
pub fn default_oneiro_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".oneiro")
}

/// Returns the default config file path: `~/.oneiro/config.toml`
pub fn default_config_path() -> PathBuf {
    default_oneiro_dir().join("config.toml")
}

impl OneiroConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            OneiroConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (ONEIRO_DB, ONEIRO_LOG_LEVEL,
    /// ONEIRO_API_KEY, PORT).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ONEIRO_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("ONEIRO_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("ONEIRO_API_KEY") {
            self.completion.api_key = val;
        }
        if let Ok(val) = std::env::var("PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
