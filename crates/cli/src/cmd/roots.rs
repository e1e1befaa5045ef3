//! List configured roots

use anyhow::Result;
use owo_colors::OwoColorize;
use watcher::BridgeConfig;

pub fn run(config: &BridgeConfig) -> Result<()> {
    let roots = config.roots();

    println!("{}", "Roots".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for id in roots.ids() {
        let marker = if id == config.output_root {
            " (output)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("{}{}", id.cyan(), marker);
        for base in roots.search_paths(id).unwrap_or_default() {
            println!("  {}", base);
        }
    }

    let aliases = roots.aliases();
    if !aliases.is_empty() {
        println!();
        println!("{}", "Aliases".bold());
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        for (alias, target) in aliases {
            let resolved = roots.resolve_id(alias).unwrap_or("?");
            println!("{} -> {} {}", alias.cyan(), target, format!("({})", resolved).dimmed());
        }
    }

    Ok(())
}
