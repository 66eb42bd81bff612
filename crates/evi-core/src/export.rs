//! XML and delimited-text export of events.
//!
//! Both formats are pure functions of an index's current contents. XML output
//! is a `<dataset>` element holding one `<point>` per event in sort order.
//! Delimited output is one row per event in a frame range, with frame counts
//! converted to real time using the caller's sample rate.

use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::TimeDelta;
use thiserror::Error;

use crate::event::{Event, Frame};
use crate::index::EventIndex;

/// Errors from delimited export.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ExportError {
    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),
    #[error("gap fill resolution must be positive, got {0}")]
    InvalidResolution(Frame),
    #[error("export range duration must be non-negative, got {0}")]
    NegativeRange(Frame),
}

/// Attribute names for the subtype-specific XML fields.
///
/// Annotation types name these differently, e.g. `height` for text
/// annotations or `extent` for boxes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportNameOptions {
    pub value_attribute: String,
    pub level_attribute: String,
    pub uri_attribute: String,
}

impl Default for ExportNameOptions {
    fn default() -> Self {
        Self {
            value_attribute: "value".to_string(),
            level_attribute: "level".to_string(),
            uri_attribute: "uri".to_string(),
        }
    }
}

/// Flags for delimited export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataExportOptions {
    /// Write frame counts instead of real time.
    pub time_in_frames: bool,
    /// Leave out the level column.
    pub omit_levels: bool,
    /// Start with a line naming the columns.
    pub include_header: bool,
}

/// Synthetic rows emitted between real events.
#[derive(Debug, Clone, PartialEq)]
pub struct GapFill {
    /// Spacing of fill rows, in frames.
    pub resolution: Frame,
    /// Event copied, at each fill frame, into the gaps.
    pub template: Event,
}

/// A delimited export request covering `[start_frame, start_frame + duration)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DelimitedExport {
    pub delimiter: String,
    pub options: DataExportOptions,
    pub sample_rate: f64,
    pub start_frame: Frame,
    pub duration: Frame,
    pub gap_fill: Option<GapFill>,
}

impl DelimitedExport {
    /// Comma-delimited export of the given range with default options.
    pub fn new(sample_rate: f64, start_frame: Frame, duration: Frame) -> Self {
        Self {
            delimiter: ",".to_string(),
            options: DataExportOptions::default(),
            sample_rate,
            start_frame,
            duration,
            gap_fill: None,
        }
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    #[must_use]
    pub const fn with_options(mut self, options: DataExportOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_gap_fill(mut self, resolution: Frame, template: Event) -> Self {
        self.gap_fill = Some(GapFill {
            resolution,
            template,
        });
        self
    }

    fn validate(&self) -> Result<(), ExportError> {
        validate_sample_rate(self.sample_rate)?;
        if self.duration < 0 {
            return Err(ExportError::NegativeRange(self.duration));
        }
        if let Some(fill) = &self.gap_fill {
            if fill.resolution <= 0 {
                return Err(ExportError::InvalidResolution(fill.resolution));
            }
        }
        Ok(())
    }
}

static LAST_EXPORT_ID: AtomicU64 = AtomicU64::new(0);

fn allocate_export_id() -> u64 {
    LAST_EXPORT_ID.fetch_add(1, Ordering::Relaxed) + 1
}

/// Escapes the five XML special characters.
pub fn encode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn validate_sample_rate(sample_rate: f64) -> Result<(), ExportError> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(ExportError::InvalidSampleRate(sample_rate))
    }
}

/// Converts a frame count to real time at the given sample rate, to the
/// nearest nanosecond.
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    reason = "frame counts are far below 2^53 and nanosecond rounding is intended"
)]
pub fn frame_to_real_time(frame: Frame, sample_rate: f64) -> TimeDelta {
    let nanos = (frame as f64 * 1e9 / sample_rate).round() as i64;
    TimeDelta::nanoseconds(nanos)
}

/// Formats real time as seconds with nine decimal places, e.g. `1.500000000`.
pub fn format_real_time(time: TimeDelta) -> String {
    let sign = if time < TimeDelta::zero() { "-" } else { "" };
    let magnitude = time.abs();
    format!(
        "{sign}{}.{:09}",
        magnitude.num_seconds(),
        magnitude.subsec_nanos()
    )
}

/// Which optional columns a delimited export carries.
#[derive(Debug, Clone, Copy, Default)]
struct Columns {
    value: bool,
    duration: bool,
    level: bool,
    uri: bool,
    label: bool,
}

impl Columns {
    fn of<'a>(events: impl IntoIterator<Item = &'a Event>, options: DataExportOptions) -> Self {
        let mut columns = Self::default();
        for event in events {
            columns.value |= event.has_value();
            columns.duration |= event.has_duration();
            columns.level |= event.has_level();
            columns.uri |= event.has_uri();
            columns.label |= event.has_label();
        }
        columns.level &= !options.omit_levels;
        columns
    }

    fn header(self, delimiter: &str, options: DataExportOptions) -> String {
        let mut fields = vec![if options.time_in_frames { "FRAME" } else { "TIME" }];
        if self.value {
            fields.push("VALUE");
        }
        if self.duration {
            fields.push("DURATION");
        }
        if self.level {
            fields.push("LEVEL");
        }
        if self.uri {
            fields.push("URI");
        }
        if self.label {
            fields.push("LABEL");
        }
        fields.join(delimiter)
    }

    fn row(
        self,
        event: &Event,
        delimiter: &str,
        options: DataExportOptions,
        sample_rate: f64,
    ) -> String {
        let time = |frames: Frame| {
            if options.time_in_frames {
                frames.to_string()
            } else {
                format_real_time(frame_to_real_time(frames, sample_rate))
            }
        };

        let mut fields = vec![time(event.frame())];
        if self.value {
            fields.push(if event.has_value() {
                event.value().to_string()
            } else {
                String::new()
            });
        }
        if self.duration {
            fields.push(if event.has_duration() {
                time(event.duration())
            } else {
                String::new()
            });
        }
        if self.level {
            fields.push(if event.has_level() {
                event.level().to_string()
            } else {
                String::new()
            });
        }
        if self.uri {
            fields.push(quote_field(event.uri(), delimiter));
        }
        if self.label {
            fields.push(quote_field(event.label(), delimiter));
        }
        fields.join(delimiter)
    }
}

/// Quotes a text field if it would otherwise break the row structure.
fn quote_field(field: &str, delimiter: &str) -> String {
    let needs_quotes = (!delimiter.is_empty() && field.contains(delimiter))
        || field.contains('"')
        || field.contains('\n');
    if needs_quotes {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

impl Event {
    /// Writes this event as an XML `<point>` element followed by a newline.
    pub fn write_xml<W: Write>(
        &self,
        out: &mut W,
        indent: &str,
        extra_attributes: &str,
        names: &ExportNameOptions,
    ) -> fmt::Result {
        write!(out, "{indent}<point frame=\"{}\" ", self.frame())?;
        if self.has_value() {
            write!(out, "{}=\"{}\" ", names.value_attribute, self.value())?;
        }
        if self.has_duration() {
            write!(out, "duration=\"{}\" ", self.duration())?;
        }
        if self.has_level() {
            write!(out, "{}=\"{}\" ", names.level_attribute, self.level())?;
        }
        if self.has_reference_frame() {
            write!(out, "referenceFrame=\"{}\" ", self.reference_frame())?;
        }
        write!(out, "label=\"{}\" ", encode_entities(self.label()))?;
        if self.has_uri() {
            write!(
                out,
                "{}=\"{}\" ",
                names.uri_attribute,
                encode_entities(self.uri())
            )?;
        }
        if !extra_attributes.is_empty() {
            write!(out, "{extra_attributes} ")?;
        }
        writeln!(out, "/>")
    }

    /// Returns this event as an XML `<point>` element.
    pub fn to_xml(&self, indent: &str, extra_attributes: &str, names: &ExportNameOptions) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_xml(&mut out, indent, extra_attributes, names);
        out
    }

    /// Returns this event as a single delimited record.
    ///
    /// Fields are time, then value, duration, level, URI and label, each
    /// present only if the event carries it.
    pub fn to_delimited(
        &self,
        delimiter: &str,
        options: DataExportOptions,
        sample_rate: f64,
    ) -> Result<String, ExportError> {
        validate_sample_rate(sample_rate)?;
        let columns = Columns::of([self], options);
        Ok(columns.row(self, delimiter, options, sample_rate))
    }
}

impl EventIndex {
    /// Identifier used for this index's `<dataset>` element.
    ///
    /// Allocated on first use and unique for the life of the process.
    pub fn export_id(&self) -> u64 {
        *self.export_id_cell().get_or_init(allocate_export_id)
    }

    /// Writes the index as an XML `<dataset>` element.
    pub fn write_xml<W: Write>(
        &self,
        out: &mut W,
        indent: &str,
        extra_attributes: &str,
        names: &ExportNameOptions,
    ) -> fmt::Result {
        let id = self.export_id();
        let state = self.lock();
        write!(out, "{indent}<dataset id=\"{id}\"")?;
        if !extra_attributes.is_empty() {
            write!(out, " {extra_attributes}")?;
        }
        writeln!(out, ">")?;
        let point_indent = format!("{indent}  ");
        for event in &state.events {
            event.write_xml(out, &point_indent, "", names)?;
        }
        writeln!(out, "{indent}</dataset>")
    }

    /// Returns the index as an XML `<dataset>` element.
    pub fn to_xml(&self, indent: &str, extra_attributes: &str, names: &ExportNameOptions) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_xml(&mut out, indent, extra_attributes, names);
        out
    }

    /// Returns the events starting within the requested range as delimited
    /// text, one record per line.
    ///
    /// Every row carries the same columns: those attributes that any
    /// exported event (or the gap fill template) has. With gap filling, fill
    /// rows are emitted every `resolution` frames from the range start up to
    /// each real event, resuming `resolution` frames after it, through to the
    /// end of the range.
    pub fn to_delimited(&self, export: &DelimitedExport) -> Result<String, ExportError> {
        export.validate()?;
        let DelimitedExport {
            delimiter,
            options,
            sample_rate,
            start_frame,
            duration,
            gap_fill,
        } = export;
        let (options, sample_rate) = (*options, *sample_rate);
        let end = start_frame.saturating_add(*duration);

        let state = self.lock();
        let selected = state.starting_within(*start_frame, end);

        let fill_template = gap_fill.as_ref().map(|fill| &fill.template);
        let columns = Columns::of(selected.iter().chain(fill_template), options);
        let row = |event: &Event| columns.row(event, delimiter, options, sample_rate);

        let mut out = String::new();
        if options.include_header {
            out.push_str(&columns.header(delimiter, options));
            out.push('\n');
        }

        match gap_fill {
            None => {
                for event in selected {
                    out.push_str(&row(event));
                    out.push('\n');
                }
            }
            Some(GapFill {
                resolution,
                template,
            }) => {
                let mut next = *start_frame;
                for event in selected {
                    while next < event.frame() {
                        out.push_str(&row(&template.clone().with_frame(next)));
                        out.push('\n');
                        next = next.saturating_add(*resolution);
                    }
                    out.push_str(&row(event));
                    out.push('\n');
                    next = next.max(event.frame().saturating_add(*resolution));
                }
                while next < end {
                    out.push_str(&row(&template.clone().with_frame(next)));
                    out.push('\n');
                    next = next.saturating_add(*resolution);
                }
            }
        }

        tracing::debug!(
            events = selected.len(),
            bytes = out.len(),
            "exported delimited data"
        );
        Ok(out)
    }
}
