//! Re-express a path between roots

use anyhow::Result;
use owo_colors::OwoColorize;
use watcher::BridgeConfig;

pub fn run(config: &BridgeConfig, path: &str, from: &str, to: &str) -> Result<()> {
    let roots = config.roots();

    if roots.resolve_id(from).is_none() {
        anyhow::bail!("Unknown root: {}", from);
    }
    if roots.resolve_id(to).is_none() {
        anyhow::bail!("Unknown root: {}", to);
    }

    match roots.transverse(path, from, to) {
        Some(resolved) => {
            println!("{}", resolved);
            Ok(())
        }
        None => {
            eprintln!(
                "{} {} is not inside root {}",
                "✗".red(),
                format!("{}:{}", from, path).cyan(),
                to.yellow()
            );
            anyhow::bail!("Path cannot be expressed in root '{}'", to)
        }
    }
}
