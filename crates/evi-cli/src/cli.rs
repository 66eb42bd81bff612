//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use evi_core::Frame;

use crate::commands::export::{ExportDelimitedArgs, ExportXmlArgs};
use crate::commands::query::{NearestArgs, RangeArgs};

/// Event index inspector.
///
/// Replays an annotation edit log into an event index, then queries or
/// exports it.
#[derive(Debug, Parser)]
#[command(name = "evi", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Edit log source shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Edit log in JSON Lines format. Reads stdin when omitted.
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show event count and frame extent.
    Stats {
        #[command(flatten)]
        input: InputArgs,
    },

    /// List events active at a frame.
    Covering {
        /// Frame to look up.
        #[arg(long, allow_negative_numbers = true)]
        frame: Frame,

        #[command(flatten)]
        input: InputArgs,
    },

    /// List events overlapping a frame range.
    Spanning(RangeArgs),

    /// List events wholly inside a frame range.
    Within {
        #[command(flatten)]
        range: RangeArgs,

        /// Extra neighbouring events to include on each side.
        #[arg(long, default_value_t = 0)]
        overspill: usize,
    },

    /// List events starting inside a frame range.
    Starting(RangeArgs),

    /// Find the nearest event from a frame.
    Nearest(NearestArgs),

    /// Write the events as an XML dataset.
    ExportXml(ExportXmlArgs),

    /// Write the events as delimited text.
    ExportDelimited(ExportDelimitedArgs),
}
