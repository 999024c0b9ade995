//! Application configuration for Bookshelf.
//!
//! User config lives at `~/.bookshelf/bookshelf.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BookshelfError, Result};
use crate::types::{FingerprintMode, NodeKind};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "bookshelf.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".bookshelf";

// ---------------------------------------------------------------------------
// Config structs (matching bookshelf.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Goodreads feed settings.
    #[serde(default)]
    pub goodreads: GoodreadsConfig,

    /// Where and how nodes are written.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[goodreads]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodreadsConfig {
    /// Goodreads user whose shelves are synced. Nothing is fetched without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Shelf filter passed to the list endpoint.
    #[serde(default = "default_shelf")]
    pub shelf: String,

    /// Name of the env var holding the developer key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the Goodreads API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GoodreadsConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            shelf: default_shelf(),
            api_key_env: default_api_key_env(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_shelf() -> String {
    "all".into()
}
fn default_api_key_env() -> String {
    "GOODREADS_API_KEY".into()
}
fn default_endpoint() -> String {
    "https://www.goodreads.com".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the node files are written under.
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Record type to emit.
    #[serde(default)]
    pub kind: NodeKind,

    /// What node fingerprints are computed over.
    #[serde(default)]
    pub fingerprint: FingerprintMode,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            kind: NodeKind::default(),
            fingerprint: FingerprintMode::default(),
        }
    }
}

fn default_output_dir() -> String {
    "content/goodreads".into()
}

// ---------------------------------------------------------------------------
// Sync settings (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime sync configuration, merged from config file + environment + CLI flags.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Goodreads user id; `None` turns the sync into a no-op.
    pub user_id: Option<String>,
    /// Shelf filter.
    pub shelf: String,
    /// Developer key, possibly empty.
    pub api_key: String,
    /// Base URL of the Goodreads API.
    pub endpoint: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Record type to emit.
    pub kind: NodeKind,
    /// Fingerprint strategy.
    pub fingerprint: FingerprintMode,
    /// Output directory for the directory sink.
    pub output_dir: PathBuf,
}

impl From<&AppConfig> for SyncSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_id: config
                .goodreads
                .user_id
                .clone()
                .filter(|id| !id.trim().is_empty()),
            shelf: config.goodreads.shelf.clone(),
            api_key: resolve_api_key(config),
            endpoint: config.goodreads.endpoint.clone(),
            timeout_secs: config.goodreads.timeout_secs,
            kind: config.output.kind,
            fingerprint: config.output.fingerprint,
            output_dir: PathBuf::from(&config.output.dir),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.bookshelf/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BookshelfError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.bookshelf/bookshelf.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BookshelfError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        BookshelfError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BookshelfError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BookshelfError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BookshelfError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the developer key from the configured env var.
///
/// The key is optional: an unset or empty variable yields an empty key, and
/// the upstream service decides whether to reject it.
pub fn resolve_api_key(config: &AppConfig) -> String {
    let var_name = &config.goodreads.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => val,
        _ => {
            tracing::debug!(var = %var_name, "no Goodreads developer key set, using empty key");
            String::new()
        }
    }
}
