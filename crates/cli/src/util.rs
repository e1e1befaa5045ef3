//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use watcher::BridgeConfig;

/// Config file name looked up from the working directory upwards
pub const CONFIG_FILE_NAME: &str = "wbridge.toml";

/// Find the nearest wbridge.toml by walking up from `start`
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load the bridge config
///
/// Order: explicit `--config`, nearest wbridge.toml, then a single
/// "garrysmod" root at `game_dir` (default: the working directory).
pub fn load_config(explicit: Option<&Path>, game_dir: Option<&Path>) -> Result<BridgeConfig> {
    if let Some(path) = explicit {
        return BridgeConfig::load(path);
    }

    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    if game_dir.is_none() {
        if let Some(path) = find_config_file(&cwd) {
            tracing::debug!("Using config file: {}", path.display());
            return BridgeConfig::load(&path);
        }
    }

    let game_dir = match game_dir {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => cwd.join(dir),
        None => cwd,
    };
    Ok(game_dir_config(game_dir))
}

/// Config with one "garrysmod" root and default settings
pub fn game_dir_config(game_dir: PathBuf) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.roots.insert(config.output_root.clone(), vec![game_dir]);
    config
}
