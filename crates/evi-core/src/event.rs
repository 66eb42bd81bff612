//! The event value type stored in an [`EventIndex`](crate::EventIndex).
//!
//! An [`Event`] is a frame position plus optional value, duration, level,
//! label, URI and reference frame. Events are immutable by convention: the
//! `with_*` and `without_*` methods consume an event and return the updated
//! copy, leaving every other field untouched.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Integer time coordinate, in sample frames.
pub type Frame = i64;

/// Errors raised when constructing or updating an event.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EventError {
    /// A duration, if present, must be non-negative.
    #[error("event duration must be non-negative, got {duration}")]
    NegativeDuration { duration: Frame },
    /// `frame + duration` must be a representable frame.
    #[error("event at frame {frame} with duration {duration} ends past the last frame")]
    EndOverflow { frame: Frame, duration: Frame },
}

/// Checks that a duration is non-negative and that the span it gives an
/// event starting at `frame` ends at a representable frame.
const fn check_duration(frame: Frame, duration: Frame) -> Result<(), EventError> {
    if duration < 0 {
        return Err(EventError::NegativeDuration { duration });
    }
    if frame.checked_add(duration).is_none() {
        return Err(EventError::EndOverflow { frame, duration });
    }
    Ok(())
}

/// A single annotation event.
///
/// Events without a duration are *point* events. Events with a duration are
/// *durational* and are active over the half-open range
/// `[frame, frame + duration)`.
///
/// Ordering is by frame, then by duration, value, level and reference frame
/// (absent before present, then by value), then by label and finally by URI.
/// Equality is structural and agrees with the ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "EventRecord", into = "EventRecord")]
pub struct Event {
    frame: Frame,
    duration: Option<Frame>,
    value: Option<f32>,
    level: Option<f32>,
    reference_frame: Option<Frame>,
    label: String,
    uri: String,
}

impl Event {
    /// Creates an unlabelled point event.
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            ..Self::default()
        }
    }

    /// Creates a labelled point event.
    pub fn labelled(frame: Frame, label: impl Into<String>) -> Self {
        Self {
            frame,
            label: label.into(),
            ..Self::default()
        }
    }

    /// Creates a point event carrying a value.
    pub fn valued(frame: Frame, value: f32, label: impl Into<String>) -> Self {
        Self {
            frame,
            value: Some(value),
            label: label.into(),
            ..Self::default()
        }
    }

    /// Creates a durational event carrying a value.
    ///
    /// # Panics
    ///
    /// Panics if `duration` is negative or the span ends past [`Frame::MAX`].
    pub fn durational(frame: Frame, value: f32, duration: Frame, label: impl Into<String>) -> Self {
        Self::valued(frame, value, label).with_duration(duration)
    }

    /// Creates a durational event carrying both a value and a level.
    ///
    /// # Panics
    ///
    /// Panics if `duration` is negative or the span ends past [`Frame::MAX`].
    pub fn leveled(
        frame: Frame,
        value: f32,
        duration: Frame,
        level: f32,
        label: impl Into<String>,
    ) -> Self {
        Self::durational(frame, value, duration, label).with_level(level)
    }

    #[must_use]
    pub const fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = frame;
        self
    }

    #[must_use]
    pub const fn with_value(mut self, value: f32) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub const fn without_value(mut self) -> Self {
        self.value = None;
        self
    }

    /// Returns a copy with the given duration.
    ///
    /// # Panics
    ///
    /// Panics if `duration` is negative or the event would end past
    /// [`Frame::MAX`]. Use [`Event::try_with_duration`] for durations that
    /// come from untrusted input.
    #[must_use]
    pub fn with_duration(self, duration: Frame) -> Self {
        match self.try_with_duration(duration) {
            Ok(event) => event,
            Err(e) => panic!("{e}"),
        }
    }

    /// Returns a copy with the given duration, rejecting negative values and
    /// spans that end past [`Frame::MAX`].
    pub fn try_with_duration(mut self, duration: Frame) -> Result<Self, EventError> {
        check_duration(self.frame, duration)?;
        self.duration = Some(duration);
        Ok(self)
    }

    #[must_use]
    pub const fn without_duration(mut self) -> Self {
        self.duration = None;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    #[must_use]
    pub const fn with_level(mut self, level: f32) -> Self {
        self.level = Some(level);
        self
    }

    #[must_use]
    pub const fn without_level(mut self) -> Self {
        self.level = None;
        self
    }

    #[must_use]
    pub const fn with_reference_frame(mut self, reference_frame: Frame) -> Self {
        self.reference_frame = Some(reference_frame);
        self
    }

    #[must_use]
    pub const fn without_reference_frame(mut self) -> Self {
        self.reference_frame = None;
        self
    }

    pub const fn frame(&self) -> Frame {
        self.frame
    }

    pub const fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Returns the value, or 0.0 if the event has none.
    pub fn value(&self) -> f32 {
        self.value.unwrap_or(0.0)
    }

    pub const fn has_duration(&self) -> bool {
        self.duration.is_some()
    }

    /// Returns the duration, or 0 if the event has none.
    pub fn duration(&self) -> Frame {
        self.duration.unwrap_or(0)
    }

    pub const fn has_level(&self) -> bool {
        self.level.is_some()
    }

    /// Returns the level, or 0.0 if the event has none.
    pub fn level(&self) -> f32 {
        self.level.unwrap_or(0.0)
    }

    pub const fn has_reference_frame(&self) -> bool {
        self.reference_frame.is_some()
    }

    /// Returns the reference frame, falling back to the event's own frame.
    pub fn reference_frame(&self) -> Frame {
        self.reference_frame.unwrap_or(self.frame)
    }

    pub fn has_label(&self) -> bool {
        !self.label.is_empty()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn has_uri(&self) -> bool {
        !self.uri.is_empty()
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// First frame after the event: `frame + duration`, or `frame` for a
    /// point event.
    ///
    /// Saturates at [`Frame::MAX`] if [`with_frame`](Self::with_frame) moved
    /// a durational event too close to the end of the frame range.
    pub fn end_frame(&self) -> Frame {
        self.frame.saturating_add(self.duration())
    }

    /// Whether the event is active over a non-empty range of frames.
    ///
    /// Point events and zero-duration events occupy no span.
    pub fn occupies_span(&self) -> bool {
        self.duration() > 0
    }
}

/// Absent sorts before present; present floats compare by IEEE total order.
fn cmp_optional_f32(a: Option<f32>, b: Option<f32>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.total_cmp(&b),
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frame
            .cmp(&other.frame)
            .then_with(|| self.duration.cmp(&other.duration))
            .then_with(|| cmp_optional_f32(self.value, other.value))
            .then_with(|| cmp_optional_f32(self.level, other.level))
            .then_with(|| self.reference_frame.cmp(&other.reference_frame))
            .then_with(|| self.label.cmp(&other.label))
            .then_with(|| self.uri.cmp(&other.uri))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl Hash for Event {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.frame.hash(state);
        self.duration.hash(state);
        self.value.map(f32::to_bits).hash(state);
        self.level.map(f32::to_bits).hash(state);
        self.reference_frame.hash(state);
        self.label.hash(state);
        self.uri.hash(state);
    }
}

/// Flat serialized form of an [`Event`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EventRecord {
    frame: Frame,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<Frame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    level: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reference_frame: Option<Frame>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    uri: String,
}

impl TryFrom<EventRecord> for Event {
    type Error = EventError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        if let Some(duration) = record.duration {
            check_duration(record.frame, duration)?;
        }
        Ok(Self {
            frame: record.frame,
            duration: record.duration,
            value: record.value,
            level: record.level,
            reference_frame: record.reference_frame,
            label: record.label,
            uri: record.uri,
        })
    }
}

impl From<Event> for EventRecord {
    fn from(event: Event) -> Self {
        Self {
            frame: event.frame,
            value: event.value,
            duration: event.duration,
            level: event.level,
            reference_frame: event.reference_frame,
            label: event.label,
            uri: event.uri,
        }
    }
}
