//! Bridge configuration
//!
//! Loaded from TOML. Describes the named roots, their aliases, the root
//! consumer paths are reported in, and the queue backlog warning level.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use paths::Roots;
use serde::{Deserialize, Serialize};

use crate::queue::DEFAULT_WARN_THRESHOLD;

/// Bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Root consumer-facing paths are expressed in (default: "garrysmod")
    #[serde(default = "default_output_root")]
    pub output_root: String,

    /// Backlog size that triggers a warning, 0 disables it (default: 10000)
    #[serde(default = "default_warn_threshold")]
    pub queue_warn_threshold: usize,

    /// Root id -> ordered search paths
    #[serde(default)]
    pub roots: BTreeMap<String, Vec<PathBuf>>,

    /// Alias id -> root id it stands for
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            queue_warn_threshold: default_warn_threshold(),
            roots: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }
}

impl BridgeConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse and validate TOML
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("Failed to parse bridge config")?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize bridge config")
    }

    /// Check that roots, aliases and the output root are consistent
    pub fn validate(&self) -> Result<()> {
        for (id, search_paths) in &self.roots {
            if search_paths.is_empty() {
                anyhow::bail!("Root '{}' has no search paths", id);
            }
        }

        let roots = self.roots();
        for (alias, target) in &self.aliases {
            if self.roots.contains_key(alias) {
                anyhow::bail!("Alias '{}' shadows a root of the same name", alias);
            }
            if roots.resolve_id(alias).is_none() {
                anyhow::bail!(
                    "Alias '{}' -> '{}' does not lead to a root (unknown target or cycle)",
                    alias,
                    target
                );
            }
        }

        if roots.resolve_id(&self.output_root).is_none() {
            anyhow::bail!("Output root '{}' is not a configured root", self.output_root);
        }

        Ok(())
    }

    /// Build the root table
    pub fn roots(&self) -> Roots {
        let mut roots = Roots::new();
        for (id, search_paths) in &self.roots {
            roots.insert(id.clone(), search_paths);
        }
        for (alias, target) in &self.aliases {
            roots.alias(alias.clone(), target.clone());
        }
        roots
    }
}

fn default_output_root() -> String {
    "garrysmod".to_string()
}

fn default_warn_threshold() -> usize {
    DEFAULT_WARN_THRESHOLD
}

/// Annotated example configuration
pub fn example_config() -> &'static str {
    r#"# Root that consumer-facing event paths are expressed in
output_root = "garrysmod"

# Warn when this many events are waiting for a tick (0 = never)
queue_warn_threshold = 10000

# Root id -> search paths, tried in order
[roots]
garrysmod = ["/srv/gmod/garrysmod"]
lsv = ["/srv/gmod/garrysmod/lua", "/srv/gmod/garrysmod/gamemodes"]

# Alias id -> root id
[aliases]
LUA = "lsv"
"#
}
