//! Application configuration for TalkMeta.
//!
//! User config lives at `~/.talkmeta/talkmeta.toml`.
//! CLI flags override config file values, which override defaults.
//!
//! This is tool-level configuration (how programs are fetched, how rows are
//! batched). The per-stage "Website Address" lives in the stage file itself.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TalkMetaError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "talkmeta.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".talkmeta";

// ---------------------------------------------------------------------------
// Config structs (matching talkmeta.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Program fetching.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Row processing.
    #[serde(default)]
    pub run: RunConfig,
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Give up on the program page after this many seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_redirects() -> usize {
    5
}

/// `[run]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Rows handed to the stage per buffer.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    1024
}

// ---------------------------------------------------------------------------
// Fetch options (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime options for the program reader.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.fetch.timeout_secs,
            max_redirects: config.fetch.max_redirects,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.talkmeta/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TalkMetaError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.talkmeta/talkmeta.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| TalkMetaError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        TalkMetaError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    if config.run.batch_size == 0 {
        return Err(TalkMetaError::config(format!(
            "{}: run.batch_size must be at least 1",
            path.display()
        )));
    }

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TalkMetaError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TalkMetaError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TalkMetaError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("timeout_secs"));
        assert!(toml_str.contains("batch_size"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[fetch]
timeout_secs = 5
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.fetch.timeout_secs, 5);
        assert_eq!(config.fetch.max_redirects, 5);
        assert_eq!(config.run.batch_size, 1024);
    }

    #[test]
    fn fetch_options_from_app_config() {
        let mut app = AppConfig::default();
        app.fetch.timeout_secs = 12;
        let opts = FetchOptions::from(&app);
        assert_eq!(opts.timeout_secs, 12);
        assert_eq!(opts.max_redirects, 5);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let dir = std::env::temp_dir().join(format!("talkmeta-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("talkmeta.toml");
        std::fs::write(&path, "[run]\nbatch_size = 0\n").expect("write config");

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("batch_size"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
