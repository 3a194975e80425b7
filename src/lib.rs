pub mod actions;
pub mod app;
pub mod config;
pub mod error_surface;
pub mod git;
pub mod logging;
pub mod operations;
pub mod paths;
pub mod platform;
pub mod selection;
pub mod types;
pub mod ui;
pub mod watcher;
