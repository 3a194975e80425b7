use anyhow::{Context, Result};
use change_review::{app, config, logging};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "change-review")]
#[command(about = "Review, select and act on working tree changes")]
struct Cli {
    /// Workspace directory
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Repository root, absolute or relative to the workspace
    #[arg(long)]
    repo_root: Option<String>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let workspace = std::path::absolute(&cli.path)
        .with_context(|| format!("Invalid workspace path {}", cli.path.display()))?;

    let loaded = config::load_config(&workspace);
    logging::init(&loaded.config.log, cli.log_file.as_deref());
    tracing::info!(event = "app.start", workspace = %workspace.display());
    loaded.log_warnings();

    let mut config = loaded.config;
    if let Some(root) = cli.repo_root {
        config.repo.root = Some(root);
    }

    app::run(&workspace, config)
}
