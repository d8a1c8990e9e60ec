//! Configuration loading and root folder resolution
//!
//! Bootstrap settings come from a TOML file. Values that can also be given
//! on the command line or in the environment are resolved in this order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "BOOKFACTORY_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "bookfactory.db";

/// Bootstrap configuration loaded from TOML file
///
/// Every field has a default so that a missing file is not an error.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Explicit database path, overrides `<root_folder>/bookfactory.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub resolution: ResolutionConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Language model settings
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,

    /// Token budget for a single consistency check reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// API key; environment variables take priority over this value
    #[serde(default)]
    pub api_key: Option<String>,
}

/// What the resolve endpoint does with a method it does not recognize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownMethodPolicy {
    /// Treat the issue as fixed (status `resolved`) and log a warning
    #[default]
    Resolve,
    /// Reject the request with a validation error
    Reject,
}

/// Resolution workflow settings
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct ResolutionConfig {
    #[serde(default)]
    pub unknown_method: UnknownMethodPolicy,
}

fn default_port() -> u16 {
    5731
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_key: None,
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            root_folder: None,
            database_path: None,
            logging: LoggingConfig::default(),
            llm: LlmConfig::default(),
            resolution: ResolutionConfig::default(),
        }
    }
}

impl BootstrapConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from an explicit file, or from the platform
    /// config location when `path` is `None`
    ///
    /// A missing default file yields built-in defaults. A missing explicit
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => match find_config_file() {
                Some(p) => p,
                None => {
                    debug!("No config file found, using built-in defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            Error::Config(format!("Failed to read config file {:?}: {}", config_path, e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded TOML configuration from {:?}", config_path);
        Ok(config)
    }

    /// Resolve the database file path
    ///
    /// `database_path` wins; otherwise the file lives in the resolved root
    /// folder.
    pub fn database_path(&self, cli_root: Option<&Path>) -> PathBuf {
        if let Some(path) = &self.database_path {
            return path.clone();
        }
        resolve_root_folder(cli_root, ROOT_FOLDER_ENV, self.root_folder.as_deref())
            .join(DATABASE_FILE_NAME)
    }

    /// Resolve the language model API key
    ///
    /// Priority: `BOOKFACTORY_ANTHROPIC_API_KEY` → `ANTHROPIC_API_KEY` → TOML
    pub fn resolve_api_key(&self) -> Option<String> {
        ["BOOKFACTORY_ANTHROPIC_API_KEY", "ANTHROPIC_API_KEY"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .chain(self.llm.api_key.clone())
            .find(|key| is_valid_key(key))
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Root folder resolution, highest priority first
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    // Priority 4: OS-dependent compiled default
    get_default_root_folder()
}

/// Locate the platform configuration file, if one exists
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("bookfactory").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/bookfactory/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/bookfactory (or /var/lib/bookfactory for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("bookfactory"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/bookfactory"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/bookfactory
        dirs::data_dir()
            .map(|d| d.join("bookfactory"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/bookfactory"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\bookfactory
        dirs::data_local_dir()
            .map(|d| d.join("bookfactory"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\bookfactory"))
    } else {
        PathBuf::from("./bookfactory_data")
    }
}
