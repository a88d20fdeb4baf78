use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub drops: DropsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_local_path")]
    pub local_path: String,
}

/// Drop lifecycle policy knobs
#[derive(Debug, Clone, Deserialize)]
pub struct DropsConfig {
    /// TTL applied when the uploader supplies no explicit expiry
    #[serde(default = "default_ttl_hours")]
    pub default_ttl_hours: i64,
    /// Maximum number of files accepted per drop
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// How often the background sweep purges expired drops
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_minutes: u64,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_db_path() -> String {
    "data/quickdrop.db".to_string()
}

fn default_local_path() -> String {
    "data/drops".to_string()
}

fn default_ttl_hours() -> i64 {
    7
}

fn default_max_files() -> usize {
    5
}

fn default_cleanup_interval() -> u64 {
    15
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_path: default_local_path(),
        }
    }
}

impl Default for DropsConfig {
    fn default() -> Self {
        Self {
            default_ttl_hours: default_ttl_hours(),
            max_files: default_max_files(),
            cleanup_interval_minutes: default_cleanup_interval(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            drops: DropsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        config.ensure_directories()?;
        Ok(config)
    }

    /// Load configuration from config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["config.toml", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: QD_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(val) = env::var("QD_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = env::var("QD_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }

        // Database overrides
        if let Ok(val) = env::var("QD_CONF_DATABASE_PATH") {
            self.database.path = val;
        }

        // Storage overrides
        if let Ok(val) = env::var("QD_CONF_STORAGE_LOCAL_PATH") {
            self.storage.local_path = val;
        }

        // Drop policy overrides
        if let Ok(val) = env::var("QD_CONF_DROPS_DEFAULT_TTL_HOURS") {
            if let Ok(hours) = val.parse() {
                self.drops.default_ttl_hours = hours;
            }
        }
        if let Ok(val) = env::var("QD_CONF_DROPS_MAX_FILES") {
            if let Ok(max) = val.parse() {
                self.drops.max_files = max;
            }
        }
        if let Ok(val) = env::var("QD_CONF_DROPS_CLEANUP_INTERVAL") {
            if let Ok(minutes) = val.parse() {
                self.drops.cleanup_interval_minutes = minutes;
            }
        }
    }

    /// Ensure required directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        // Ensure database directory exists
        if let Some(parent) = Path::new(&self.database.path).parent() {
            fs::create_dir_all(parent)?;
        }

        // Ensure local storage directory exists
        fs::create_dir_all(&self.storage.local_path)?;

        Ok(())
    }
}
