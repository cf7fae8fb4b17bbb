use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::StorageBackend;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the API, e.g. "https://cashflow.example.com/api/"
  pub base_url: String,
  /// Per-request timeout
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// Cache backend: auto, memory, sqlite, or disabled
  #[serde(default)]
  pub backend: StorageBackend,
  /// Override for the SQLite database file
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Default filter directive; RUST_LOG takes precedence
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Directory for log files (defaults to the data directory)
  pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      dir: None,
    }
  }
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./cashflow.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/cashflow/config.yaml
  /// 4. ~/.config/cashflow/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/cashflow/config.yaml\n\
                 with at least:\n  api:\n    base_url: https://your-server/api/"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    Self::search_paths().into_iter().find(|p| p.exists())
  }

  /// Candidate config locations after an explicit path, in lookup order.
  fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("cashflow.yaml")];

    if let Some(config_dir) = dirs::config_dir() {
      paths.push(config_dir.join("cashflow").join("config.yaml"));
    }

    // Platforms whose config dir is not ~/.config still honor it
    if let Some(home) = dirs::home_dir() {
      let dot_config = home.join(".config").join("cashflow").join("config.yaml");
      if !paths.contains(&dot_config) {
        paths.push(dot_config);
      }
    }

    paths
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  /// Parse configuration from YAML text.
  pub fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    Ok(config)
  }

  /// Get the API token from environment variables, if any.
  ///
  /// Checks CASHFLOW_API_TOKEN. Requests go out unauthenticated when unset.
  pub fn get_api_token() -> Option<String> {
    std::env::var("CASHFLOW_API_TOKEN")
      .ok()
      .filter(|t| !t.trim().is_empty())
  }

  /// Directory for application data (cache database, logs).
  pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("cashflow"))
  }
}
