//! Watch paths and print events from a tick loop

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::io::Write;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::info;
use watcher::{Action, Bridge, BridgeConfig, Consumer, FileEvent};

/// Prints each event to stdout
pub struct PrintConsumer {
    json: bool,
}

impl PrintConsumer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl Consumer for PrintConsumer {
    fn on_file_event(&mut self, event: &FileEvent) -> Result<()> {
        let mut stdout = std::io::stdout().lock();

        if self.json {
            serde_json::to_writer(&mut stdout, event)?;
            writeln!(stdout)?;
            return Ok(());
        }

        writeln!(
            stdout,
            "{} {} {}",
            action_label(event.action),
            format!("#{}", event.watch_id).dimmed(),
            display_path(&event.path)
        )?;
        Ok(())
    }
}

fn action_label(action: Action) -> String {
    let label = format!("{:<8}", action.as_str());
    match action {
        Action::Add => label.green().to_string(),
        Action::Delete => label.red().to_string(),
        Action::Modified => label.yellow().to_string(),
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<outside output root>".dimmed().to_string()
    } else {
        path.to_string()
    }
}

pub async fn run(
    config: &BridgeConfig,
    paths: &[String],
    root: &str,
    json: bool,
    tick_ms: u64,
) -> Result<()> {
    let mut bridge = Bridge::with_notify(PrintConsumer::new(json), config)
        .context("Failed to start file watch bridge")?;

    let mut watched = 0;
    for path in paths {
        match bridge.watch(path, root) {
            Ok(id) => {
                watched += 1;
                eprintln!(
                    "{} {} {}",
                    "✓".green(),
                    format!("#{}", id).dimmed(),
                    format!("{}:{}", root, path).cyan()
                );
            }
            Err(e) => {
                eprintln!(
                    "{} {} {}",
                    "✗".red(),
                    format!("{}:{}", root, path).cyan(),
                    format!("{} ({})", e, e.code().get()).dimmed()
                );
            }
        }
    }
    if watched == 0 {
        anyhow::bail!("Nothing to watch");
    }

    eprintln!("{}", "Watching for changes, Ctrl-C to stop".dimmed());

    let mut interval = tokio::time::interval(Duration::from_millis(tick_ms.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = interval.tick() => bridge.tick(),
            res = &mut ctrl_c => {
                res.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    // Deliver whatever arrived before the signal
    bridge.tick();

    let stats = bridge.stats();
    info!(
        delivered = stats.totals.delivered,
        discarded = stats.totals.discarded,
        failed = stats.totals.failed,
        high_water = stats.queue_high_water,
        "Watch session finished"
    );
    bridge.shutdown();

    eprintln!(
        "{} {} events delivered across {} watches",
        "Done.".bold(),
        stats.totals.delivered,
        stats.active_watches
    );
    Ok(())
}
