//! Replaying annotation edit logs into an event index.
//!
//! An edit log is JSON Lines: one event record per line, with an optional
//! `"op"` of `"add"` (the default) or `"remove"`.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use evi_core::{Event, EventIndex};

/// What a log line does to the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditOp {
    #[default]
    Add,
    Remove,
}

#[derive(Debug, Deserialize)]
struct EditLine {
    #[serde(default)]
    op: EditOp,
    #[serde(flatten)]
    event: Event,
}

/// Replays the log at `path`, or stdin when no path is given.
pub fn load(path: Option<&Path>) -> Result<EventIndex> {
    let index = match path {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            replay(BufReader::new(file))
                .with_context(|| format!("failed to replay {}", path.display()))?
        }
        None => replay(io::stdin().lock()).context("failed to replay stdin")?,
    };
    tracing::debug!(events = index.count(), "loaded edit log");
    Ok(index)
}

/// Applies every edit in `reader` to a fresh index.
pub fn replay<R: BufRead>(reader: R) -> Result<EventIndex> {
    let index = EventIndex::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let edit: EditLine = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid event on line {}", idx + 1))?;
        match edit.op {
            EditOp::Add => index.add(edit.event),
            EditOp::Remove => index.remove(&edit.event),
        }
    }
    Ok(index)
}
