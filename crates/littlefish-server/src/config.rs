/*
[INPUT]:  YAML configuration file, BLOCKFROST_PROJECT_ID environment variable
[OUTPUT]: Parsed and validated server configuration
[POS]:    Configuration layer - server setup
[UPDATE]: When adding new configuration options
*/

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use littlefish_adapter::Network;
use littlefish_adapter::auth::DEFAULT_SERVICE_NAME;
use serde::{Deserialize, Serialize};

pub const PROJECT_ID_ENV: &str = "BLOCKFROST_PROJECT_ID";

/// Top-level configuration for the Littlefish server
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpConfig,
    pub indexer: IndexerConfig,
    pub challenge: ChallengeConfig,
    pub storage: StorageConfig,
    /// Accounts created at start-up when their username is free
    pub users: Vec<SeedUser>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_addr: String,
    /// Name embedded in challenge messages
    pub service_name: String,
    /// Mark the session cookie `Secure` (HTTPS deployments)
    pub cookie_secure: bool,
    /// Browser origins allowed to call the API with credentials
    pub allowed_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            cookie_secure: false,
            allowed_origins: Vec::new(),
        }
    }
}

/// What to do when no indexer key is configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexerMode {
    /// Serve clearly labelled demo figures
    #[default]
    Demo,
    /// Fail closed with `SERVICE_MISCONFIGURED`
    Production,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub mode: IndexerMode,
    pub network: Network,
    /// Defaults to the public Blockfrost endpoint for `network`
    pub base_url: Option<String>,
    #[serde(skip_serializing)]
    pub project_id: Option<String>,
    pub timeout_secs: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            mode: IndexerMode::Demo,
            network: Network::Mainnet,
            base_url: None,
            project_id: None,
            timeout_secs: 10,
        }
    }
}

impl IndexerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured key, ignoring blank values
    pub fn project_id(&self) -> Option<&str> {
        self.project_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChallengeConfig {
    pub ttl_secs: u64,
    pub max_clock_skew_secs: u64,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_clock_skew_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding registered users; in-memory when unset
    pub users_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Also write a daily rolling log file into this directory
    pub directory: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from YAML file, then apply environment overrides
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yaml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Secrets may come from the environment instead of the file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(project_id) = std::env::var(PROJECT_ID_ENV) {
            if !project_id.trim().is_empty() {
                self.indexer.project_id = Some(project_id);
            }
        }
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .bind_addr
            .parse()
            .with_context(|| format!("invalid bind address '{}'", self.server.bind_addr))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.bind_addr()?;
        if self.server.service_name.trim().is_empty() {
            bail!("server.service_name cannot be empty");
        }
        if self.indexer.mode == IndexerMode::Production && self.indexer.project_id().is_none() {
            bail!("indexer.mode is production but no project id is set (use {PROJECT_ID_ENV})");
        }
        if self.indexer.timeout_secs == 0 {
            bail!("indexer.timeout_secs must be positive");
        }
        if self.challenge.ttl_secs == 0 {
            bail!("challenge.ttl_secs must be positive");
        }
        for user in &self.users {
            if user.username.trim().is_empty() || user.password.is_empty() {
                bail!("seed users need a username and password");
            }
        }
        Ok(())
    }
}
