use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "ServerConfig::default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            max_message_bytes: Self::default_max_message_bytes(),
        }
    }
}

impl ServerConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    const fn default_max_message_bytes() -> usize {
        10 * 1024 * 1024
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub openai: OpenAiConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "OpenAiConfig::default_model")]
    pub model: String,
}

impl OpenAiConfig {
    fn default_model() -> String {
        "gpt-4o".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "DatabaseConfig::default_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
        }
    }
}

impl DatabaseConfig {
    fn default_url() -> String {
        "sqlite://ember.db?mode=rwc".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    /// Seconds between idle-session sweeps.
    #[serde(default = "SessionConfig::default_reap_interval_secs")]
    pub reap_interval_secs: u64,
    /// Seconds of inactivity before a cached session is evicted.
    #[serde(default = "SessionConfig::default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reap_interval_secs: Self::default_reap_interval_secs(),
            idle_timeout_secs: Self::default_idle_timeout_secs(),
        }
    }
}

impl SessionConfig {
    const fn default_reap_interval_secs() -> u64 {
        60 * 60
    }

    const fn default_idle_timeout_secs() -> u64 {
        24 * 60 * 60
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MemoryConfig {
    /// How many recent memories to inject into new system prompts.
    #[serde(default = "MemoryConfig::default_recent_limit")]
    pub recent_limit: u64,
    #[serde(default = "MemoryConfig::default_embedding_dim")]
    pub embedding_dim: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            recent_limit: Self::default_recent_limit(),
            embedding_dim: Self::default_embedding_dim(),
        }
    }
}

impl MemoryConfig {
    const fn default_recent_limit() -> u64 {
        5
    }

    const fn default_embedding_dim() -> usize {
        1536
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(".ember");

        let config_path = config_dir.join("config.json");

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'ember init' to create config.",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(&config_path)?;
        let mut config: Self = serde_json::from_str(&content)?;
        config.apply_env_overrides();

        Ok(config)
    }

    /// Environment variables win over the config file.
    fn apply_env_overrides(&mut self) {
        let non_empty = |v: String| if v.is_empty() { None } else { Some(v) };

        if let Some(key) = std::env::var("OPENAI_API_KEY").ok().and_then(non_empty) {
            debug!("Using OPENAI_API_KEY from environment");
            self.providers.openai.api_key = key;
        }
        if let Some(url) = std::env::var("DATABASE_URL").ok().and_then(non_empty) {
            debug!("Using DATABASE_URL from environment");
            self.database.url = url;
        }
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(".ember");

        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        let config_template = r#"{
  "server": {
    "listen_addr": "0.0.0.0:8080",
    "max_message_bytes": 10485760
  },
  "providers": {
    "openai": {
      "api_key": "your-openai-api-key-here",
      "model": "gpt-4o"
    }
  },
  "database": {
    "url": "sqlite://ember.db?mode=rwc"
  },
  "session": {
    "reap_interval_secs": 3600,
    "idle_timeout_secs": 86400
  },
  "memory": {
    "recent_limit": 5,
    "embedding_dim": 1536
  }
}"#;

        std::fs::write(&config_path, config_template)?;

        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Next steps:");
        println!("   1. Edit the config file and add your OpenAI API key");
        println!("      (or export OPENAI_API_KEY to override it)");
        println!("   2. Run 'ember serve' to start the gateway");
        println!();
        Ok(())
    }
}
