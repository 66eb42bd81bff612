//! Export commands for writing an index as XML or delimited text.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;

use evi_core::{DataExportOptions, DelimitedExport, Event, EventIndex, Frame};

use crate::Config;
use crate::cli::InputArgs;

#[derive(Debug, Clone, Args)]
pub struct ExportXmlArgs {
    /// Attribute name for event values.
    #[arg(long)]
    pub value_attr: Option<String>,

    /// Attribute name for event levels.
    #[arg(long)]
    pub level_attr: Option<String>,

    /// Attribute name for event URIs.
    #[arg(long)]
    pub uri_attr: Option<String>,

    /// Extra attributes written verbatim into the dataset element.
    #[arg(long)]
    pub extra: Option<String>,

    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Clone, Args)]
pub struct ExportDelimitedArgs {
    /// First frame to export. Defaults to the index start frame.
    #[arg(long, allow_negative_numbers = true)]
    pub start: Option<Frame>,

    /// Number of frames to export. Defaults to the rest of the index.
    #[arg(long)]
    pub duration: Option<Frame>,

    /// Samples per second for real-time columns.
    #[arg(long)]
    pub sample_rate: Option<f64>,

    /// Field separator.
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Write frame counts instead of seconds.
    #[arg(long)]
    pub frames: bool,

    /// Start with a header line naming the columns.
    #[arg(long)]
    pub header: bool,

    /// Leave out the level column.
    #[arg(long)]
    pub omit_levels: bool,

    /// Emit fill rows every N frames between events.
    #[arg(long)]
    pub fill_resolution: Option<Frame>,

    /// Label for fill rows.
    #[arg(long)]
    pub fill_label: Option<String>,

    #[command(flatten)]
    pub input: InputArgs,
}

pub fn run_xml<W: Write>(
    writer: &mut W,
    index: &EventIndex,
    args: &ExportXmlArgs,
    config: &Config,
) -> Result<()> {
    let mut names = config.export_names();
    if let Some(attr) = &args.value_attr {
        names.value_attribute.clone_from(attr);
    }
    if let Some(attr) = &args.level_attr {
        names.level_attribute.clone_from(attr);
    }
    if let Some(attr) = &args.uri_attr {
        names.uri_attribute.clone_from(attr);
    }

    let xml = index.to_xml("", args.extra.as_deref().unwrap_or_default(), &names);
    writer.write_all(xml.as_bytes())?;
    Ok(())
}

/// Builds the export request from flags, falling back to config values.
pub fn delimited_request(
    index: &EventIndex,
    args: &ExportDelimitedArgs,
    config: &Config,
) -> DelimitedExport {
    let start = args.start.unwrap_or_else(|| index.start_frame());
    // Through the end frame inclusive, so a trailing point event is kept.
    let duration = args
        .duration
        .unwrap_or_else(|| {
            index
                .end_frame()
                .saturating_sub(start)
                .saturating_add(1)
                .max(0)
        });
    let sample_rate = args.sample_rate.unwrap_or(config.sample_rate);
    let delimiter = args.delimiter.as_ref().unwrap_or(&config.delimiter);

    let mut request = DelimitedExport::new(sample_rate, start, duration)
        .with_delimiter(delimiter.as_str())
        .with_options(DataExportOptions {
            time_in_frames: args.frames,
            omit_levels: args.omit_levels,
            include_header: args.header,
        });

    if let Some(resolution) = args.fill_resolution.or(config.fill_resolution) {
        let template = args
            .fill_label
            .as_ref()
            .map_or_else(|| Event::new(0), |label| Event::labelled(0, label.as_str()));
        request = request.with_gap_fill(resolution, template);
    }
    request
}

pub fn run_delimited<W: Write>(
    writer: &mut W,
    index: &EventIndex,
    args: &ExportDelimitedArgs,
    config: &Config,
) -> Result<()> {
    let request = delimited_request(index, args, config);
    tracing::debug!(?request, "delimited export");
    let text = index
        .to_delimited(&request)
        .context("failed to export delimited data")?;
    writer.write_all(text.as_bytes())?;
    Ok(())
}
