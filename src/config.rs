use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const LOCAL_CONFIG_FILE: &str = ".change-review.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default)]
    pub repo: RepoConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// [repo] section configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Repository root, absolute or relative to the workspace
    #[serde(default)]
    pub root: Option<String>,
    /// How many directory levels to search for nested repositories
    #[serde(default = "default_scan_depth")]
    pub scan_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_flash_timeout")]
    pub flash_timeout_secs: u64,
    #[serde(default = "default_log_limit")]
    pub log_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_scan_depth() -> usize {
    2
}

fn default_flash_timeout() -> u64 {
    3
}

fn default_log_limit() -> usize {
    200
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            root: None,
            scan_depth: default_scan_depth(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            flash_timeout_secs: default_flash_timeout(),
            log_limit: default_log_limit(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("change-review").join("config.toml"))
}

/// Result of loading the config files. Problems are kept so they can be logged
/// once the subscriber exists.
#[derive(Debug, Default)]
pub struct LoadedConfig {
    pub config: ReviewConfig,
    pub warnings: Vec<ConfigWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    ParseFailed { path: PathBuf, error: String },
    Invalid { error: String },
}

impl LoadedConfig {
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            match warning {
                ConfigWarning::ParseFailed { path, error } => {
                    tracing::warn!(event = "config.parse_failed", path = %path.display(), %error);
                }
                ConfigWarning::Invalid { error } => {
                    tracing::warn!(event = "config.invalid", %error, "falling back to defaults");
                }
            }
        }
    }
}

/// Load config by merging global defaults with per-workspace overrides.
/// Priority: `<workspace>/.change-review.toml` > global config > built-in defaults.
pub fn load_config(workspace: &Path) -> LoadedConfig {
    load_layered(global_config_path().as_deref(), &workspace.join(LOCAL_CONFIG_FILE))
}

fn read_table(
    path: &Path,
    warnings: &mut Vec<ConfigWarning>,
) -> Option<toml::map::Map<String, toml::Value>> {
    let content = std::fs::read_to_string(path).ok()?;
    match content.parse::<toml::Value>() {
        Ok(toml::Value::Table(table)) => Some(table),
        Ok(_) => None,
        Err(e) => {
            warnings.push(ConfigWarning::ParseFailed {
                path: path.to_path_buf(),
                error: e.to_string(),
            });
            None
        }
    }
}

fn load_layered(global: Option<&Path>, local: &Path) -> LoadedConfig {
    let mut warnings = Vec::new();
    let global_table = global.and_then(|path| read_table(path, &mut warnings));
    let local_table = read_table(local, &mut warnings);

    let merged = match (global_table, local_table) {
        (Some(mut global), Some(local)) => {
            deep_merge(&mut global, local);
            global
        }
        (Some(table), None) | (None, Some(table)) => table,
        (None, None) => {
            return LoadedConfig {
                config: ReviewConfig::default(),
                warnings,
            }
        }
    };

    let config = toml::Value::Table(merged).try_into().unwrap_or_else(|e: toml::de::Error| {
        warnings.push(ConfigWarning::Invalid { error: e.to_string() });
        ReviewConfig::default()
    });
    LoadedConfig { config, warnings }
}

/// Recursively merge `overlay` into `base`. Overlay values win; nested tables are merged recursively.
fn deep_merge(
    base: &mut toml::map::Map<String, toml::Value>,
    overlay: toml::map::Map<String, toml::Value>,
) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
