//! Core data layer for audio annotation events.
//!
//! This crate contains:
//! - [`Event`]: an immutable time-indexed record (point or durational)
//! - [`EventIndex`]: a thread-safe ordered multiset of events answering
//!   covering, spanning, within and starting-within queries
//! - Export adapters producing XML datasets and delimited text

mod event;
pub mod export;
mod index;
mod seams;

pub use event::{Event, EventError, Frame};
pub use export::{DataExportOptions, DelimitedExport, ExportError, ExportNameOptions, GapFill};
pub use index::{Direction, EventIndex};
