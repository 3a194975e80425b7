use crate::config::LogConfig;
use anyhow::{Context, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "CHANGE_REVIEW_LOG";

pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("change-review").join("change-review.log"))
}

/// `CHANGE_REVIEW_LOG` wins over the configured level.
pub fn build_filter(configured_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(configured_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Installs the global subscriber. The terminal belongs to the UI, so events go
/// to a file, or nowhere when no file can be opened.
pub fn init(config: &LogConfig, file_override: Option<&Path>) {
    let filter = build_filter(&config.level);
    let path = file_override
        .map(Path::to_path_buf)
        .or_else(|| config.file.clone())
        .or_else(default_log_path);

    let file = path.as_deref().map(open_log_file).transpose();
    match file {
        Ok(Some(file)) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init();
        }
        Ok(None) | Err(_) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
}
