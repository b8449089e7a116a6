//! `chatline history`: preview the seeded scrollback for a partner

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::Result;
use crate::history::{LogStore, MessageLogBridge, Scrollback, SqliteLogStore};
use crate::notification::memory::RenderedEntry;
use crate::notification::{MemorySink, ACTION_STYLE, LOG_STYLE};
use crate::transport::AccountId;

/// One transcript line as printed or serialized
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptLine {
    /// `message` or `divider`
    pub kind: &'static str,
    pub text: String,
    pub classes: Vec<String>,
}

/// Turn rendered sink entries into transcript lines, oldest first
pub fn transcript(entries: &[RenderedEntry]) -> Vec<TranscriptLine> {
    entries
        .iter()
        .map(|entry| TranscriptLine {
            kind: if entry.is_real { "message" } else { "divider" },
            text: entry.text.clone(),
            classes: entry.hints.style_classes.clone(),
        })
        .collect()
}

/// Resolve the log store: CLI path, then config, then the platform default
pub fn open_store(config: &Config, db: Option<PathBuf>) -> Result<SqliteLogStore> {
    match db.or_else(|| config.log_store.path.clone()) {
        Some(path) => Ok(SqliteLogStore::new_with_path(path)),
        None => SqliteLogStore::new(),
    }
}

/// Seed a scrollback for `partner` from the log and print it
pub async fn show_history(
    config: &Config,
    account: &str,
    partner: &str,
    limit: Option<usize>,
    db: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let store = open_store(config, db)?;
    tracing::debug!(db = %store.db_path().display(), "Opening conversation log");

    let entries = render(config, Arc::new(store), account, partner, limit).await?;
    let lines = transcript(&entries);

    if json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }

    if lines.is_empty() {
        println!("{}", format!("No logged messages with {}.", partner).yellow());
        return Ok(());
    }

    println!();
    for line in &lines {
        print_line(line);
    }
    println!();
    Ok(())
}

async fn render(
    config: &Config,
    store: Arc<dyn LogStore>,
    account: &str,
    partner: &str,
    limit: Option<usize>,
) -> Result<Vec<RenderedEntry>> {
    let limit = limit.unwrap_or(config.scrollback.history_lines);
    let bridge = MessageLogBridge::new(store);
    let logged = bridge
        .fetch_recent(&AccountId::from(account), partner, limit)
        .await?;

    let sink = Arc::new(MemorySink::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut scrollback = Scrollback::new(config.scrollback.clone(), clock, sink.clone());
    scrollback.seed(partner, &logged, &[]);

    Ok(sink.entries())
}

fn print_line(line: &TranscriptLine) {
    if line.kind == "divider" {
        println!("{:>60}", line.text.dimmed());
        return;
    }

    let has = |class: &str| line.classes.iter().any(|c| c == class);
    let text = if has("chat-sent") {
        line.text.green()
    } else {
        line.text.cyan()
    };
    let text = if has(ACTION_STYLE) { text.italic() } else { text };
    if has(LOG_STYLE) {
        println!("  {}", text);
    } else {
        println!("  {}", text.bold());
    }
}
