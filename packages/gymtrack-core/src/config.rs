//! Client configuration: API endpoint, request timeout and credential storage.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default API URL (local development server)
pub const DEFAULT_API_URL: &str = "http://localhost:3333";

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Environment variable name for API URL override
pub const ENV_API_URL: &str = "GYMTRACK_API_URL";

/// Environment variable name for storage backend override
pub const ENV_STORAGE: &str = "GYMTRACK_STORAGE";

/// Directory name under the platform config dir
pub(crate) const APP_DIR: &str = "gymtrack";

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    api: Option<ApiSection>,
    storage: Option<StorageSection>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiSection {
    /// API endpoint URL (e.g., "https://gym.example.com")
    url: Option<String>,
    /// Request timeout in seconds
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct StorageSection {
    /// "keyring", "file" or "memory"
    backend: Option<String>,
    /// Directory for file-based credential storage
    dir: Option<PathBuf>,
}

/// Where credentials are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Platform keychain with file fallback
    Keyring,
    /// Owner-only files in the config directory
    File,
    /// Process memory only; nothing survives a restart
    Memory,
}

impl StorageBackend {
    /// Backend used when nothing is configured.
    pub fn platform_default() -> Self {
        if cfg!(all(feature = "keyring-storage", not(feature = "file-storage"))) {
            StorageBackend::Keyring
        } else {
            StorageBackend::File
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyring" | "keychain" => Ok(StorageBackend::Keyring),
            "file" => Ok(StorageBackend::File),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Keyring => write!(f, "keyring"),
            StorageBackend::File => write!(f, "file"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Runtime client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for API calls, without trailing slash
    pub api_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Credential storage backend
    pub storage: StorageBackend,
    /// Override for the file storage directory
    pub storage_dir: Option<PathBuf>,
    /// Source of the API URL (for logging)
    pub source: ConfigSource,
}

impl ClientConfig {
    /// Configuration pointing at `api_url` with in-memory storage.
    pub fn for_url(api_url: &str) -> Self {
        Self {
            api_url: normalize_url(api_url).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            storage: StorageBackend::Memory,
            storage_dir: None,
            source: ConfigSource::Default,
        }
    }
}

/// Where the configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Using default hardcoded values
    Default,
    /// Loaded from environment variable
    Environment,
    /// Loaded from config file
    ConfigFile,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::ConfigFile => write!(f, "config file"),
        }
    }
}

/// Get the gymtrack config directory
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join(APP_DIR))
}

/// Get the path to the configuration file
fn get_config_file_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

/// Load configuration from the config file
fn load_config_file() -> Option<ConfigFile> {
    let path = get_config_file_path()?;

    if !path.exists() {
        return None;
    }

    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read config file {:?}: {}", path, e);
            None
        }
    }
}

fn normalize_url(url: &str) -> Option<String> {
    let url = url.trim().trim_end_matches('/');
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

/// Load client configuration with priority:
/// 1. Environment variables (GYMTRACK_API_URL, GYMTRACK_STORAGE)
/// 2. Config file (~/.config/gymtrack/config.toml)
/// 3. Default values
pub fn load_client_config() -> ClientConfig {
    resolve_config(
        std::env::var(ENV_API_URL).ok(),
        std::env::var(ENV_STORAGE).ok(),
        load_config_file(),
    )
}

fn resolve_config(
    env_url: Option<String>,
    env_storage: Option<String>,
    file: Option<ConfigFile>,
) -> ClientConfig {
    let file = file.unwrap_or_default();
    let api = file.api.unwrap_or_default();
    let storage = file.storage.unwrap_or_default();

    let (api_url, source) = if let Some(url) = env_url.as_deref().and_then(normalize_url) {
        tracing::info!("Using API URL from environment variable: {}", url);
        (url, ConfigSource::Environment)
    } else if let Some(url) = api.url.as_deref().and_then(normalize_url) {
        tracing::info!("Using API URL from config file: {}", url);
        (url, ConfigSource::ConfigFile)
    } else {
        tracing::debug!("Using default API URL: {}", DEFAULT_API_URL);
        (DEFAULT_API_URL.to_string(), ConfigSource::Default)
    };

    let backend = env_storage
        .or(storage.backend)
        .and_then(|raw| match raw.parse::<StorageBackend>() {
            Ok(b) => Some(b),
            Err(e) => {
                tracing::warn!("{}, using {}", e, StorageBackend::platform_default());
                None
            }
        })
        .unwrap_or_else(StorageBackend::platform_default);

    ClientConfig {
        api_url,
        timeout: Duration::from_secs(
            api.timeout_secs
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        ),
        storage: backend,
        storage_dir: storage.dir,
        source,
    }
}

/// Get the path to the config file for documentation purposes
pub fn get_config_file_path_string() -> String {
    get_config_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.config/gymtrack/config.toml".to_string())
}

/// Generate example config file content
pub fn generate_example_config() -> String {
    r#"# GymTrack Configuration
# Place this file at: ~/.config/gymtrack/config.toml

[api]
# API endpoint URL
# Default: http://localhost:3333
# url = "https://gym.example.com"

# Request timeout in seconds
# timeout_secs = 10

[storage]
# Where credentials are kept: "keyring", "file" or "memory"
# backend = "keyring"

# Directory for file-based storage (default: ~/.config/gymtrack)
# dir = "/var/lib/gymtrack"
"#
    .to_string()
}
