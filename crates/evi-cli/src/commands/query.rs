//! Query commands printing matching events as JSON Lines.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;

use evi_core::{Direction, Event, EventIndex, Frame};

use crate::cli::InputArgs;

/// A half-open frame range `[frame, frame + duration)`.
#[derive(Debug, Clone, Args)]
pub struct RangeArgs {
    /// First frame of the range.
    #[arg(long, allow_negative_numbers = true)]
    pub frame: Frame,

    /// Length of the range in frames.
    #[arg(long)]
    pub duration: Frame,

    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Clone, Args)]
pub struct NearestArgs {
    /// Frame to search from.
    #[arg(long, allow_negative_numbers = true)]
    pub frame: Frame,

    /// Search earlier frames instead of later ones.
    #[arg(long)]
    pub backward: bool,

    /// Only match events with this label.
    #[arg(long)]
    pub label: Option<String>,

    #[command(flatten)]
    pub input: InputArgs,
}

fn write_events<W: Write>(writer: &mut W, events: &[Event]) -> Result<()> {
    for event in events {
        let line = serde_json::to_string(event).context("failed to encode event")?;
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

pub fn covering<W: Write>(writer: &mut W, index: &EventIndex, frame: Frame) -> Result<()> {
    write_events(writer, &index.events_covering(frame))
}

pub fn spanning<W: Write>(writer: &mut W, index: &EventIndex, range: &RangeArgs) -> Result<()> {
    write_events(writer, &index.events_spanning(range.frame, range.duration))
}

pub fn within<W: Write>(
    writer: &mut W,
    index: &EventIndex,
    range: &RangeArgs,
    overspill: usize,
) -> Result<()> {
    write_events(
        writer,
        &index.events_within(range.frame, range.duration, overspill),
    )
}

pub fn starting<W: Write>(writer: &mut W, index: &EventIndex, range: &RangeArgs) -> Result<()> {
    write_events(
        writer,
        &index.events_starting_within(range.frame, range.duration),
    )
}

pub fn nearest<W: Write>(writer: &mut W, index: &EventIndex, args: &NearestArgs) -> Result<()> {
    let direction = if args.backward {
        Direction::Backward
    } else {
        Direction::Forward
    };
    let label = args.label.as_deref();
    let found = index.nearest_event_matching(
        args.frame,
        |event| label.is_none_or(|l| event.label() == l),
        direction,
    );
    match found {
        Some(event) => write_events(writer, &[event]),
        None => {
            writeln!(writer, "No matching event.")?;
            Ok(())
        }
    }
}
