//! The event index.
//!
//! [`EventIndex`] stores events sorted by their total order, duplicates
//! included, alongside a seam map describing which durational events are
//! active where. Point lookups come from binary search over the sorted
//! events; overlap lookups come from the seam map and are then expanded back
//! to the full multiplicity recorded in the event list.
//!
//! # Thread Safety
//!
//! All state sits behind one [`Mutex`], so an `EventIndex` can be shared
//! between a GUI thread and background threads (typically through an `Arc`).
//! Every method holds the lock for its whole duration, which makes each call
//! observe a fully-applied prior state. The lock is not reentrant: see
//! [`EventIndex::nearest_event_matching`].

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use crate::event::{Event, Frame};
use crate::seams::SeamMap;

/// Direction of a [`EventIndex::nearest_event_matching`] scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards later frames, starting at the search frame itself.
    Forward,
    /// Towards earlier frames, starting just before the search frame.
    Backward,
}

/// Lock-protected contents of an [`EventIndex`].
#[derive(Debug, Clone, Default)]
pub(crate) struct Series {
    pub(crate) events: Vec<Event>,
    pub(crate) seams: SeamMap,
    /// Greatest frame among events occupying no span, or 0.
    pub(crate) last_point_frame: Frame,
}

impl Series {
    /// Position of the first event not less than `event`.
    fn lower_bound(&self, event: &Event) -> usize {
        self.events.partition_point(|e| e < event)
    }

    /// Position just past the last event equal to `event`.
    fn upper_bound(&self, event: &Event) -> usize {
        self.events.partition_point(|e| e <= event)
    }

    /// Position of the first event at or after `frame`.
    pub(crate) fn lower_bound_frame(&self, frame: Frame) -> usize {
        self.events.partition_point(|e| e.frame() < frame)
    }

    fn add(&mut self, event: Event) {
        let unique = self.events.get(self.lower_bound(&event)) != Some(&event);

        if event.occupies_span() {
            if unique {
                self.seams.insert(&event);
            }
        } else if event.frame() > self.last_point_frame {
            self.last_point_frame = event.frame();
        }

        let at = self.upper_bound(&event);
        tracing::trace!(frame = event.frame(), position = at, unique, "adding event");
        self.events.insert(at, event);
    }

    fn remove(&mut self, event: &Event) {
        let at = self.lower_bound(event);
        if self.events.get(at) != Some(event) {
            tracing::debug!(frame = event.frame(), "ignoring removal of absent event");
            return;
        }
        let unique = self.events.get(at + 1) != Some(event);
        let removed = self.events.remove(at);
        tracing::trace!(frame = removed.frame(), position = at, unique, "removed event");

        if !unique {
            return;
        }
        if removed.occupies_span() {
            self.seams.remove(&removed);
        } else if removed.frame() == self.last_point_frame {
            self.last_point_frame = self
                .events
                .iter()
                .rev()
                .find(|e| !e.occupies_span())
                .map_or(0, Event::frame);
            tracing::debug!(
                last_point_frame = self.last_point_frame,
                "recomputed final point frame"
            );
        }
    }

    fn clear(&mut self) {
        self.events.clear();
        self.seams.clear();
        self.last_point_frame = 0;
    }

    /// Appends every stored copy of each event in `found`, in order.
    fn expand_duplicates<'a>(
        &self,
        found: impl IntoIterator<Item = &'a Event>,
        out: &mut Vec<Event>,
    ) {
        for event in found {
            let from = self.lower_bound(event);
            let to = self.upper_bound(event);
            out.extend_from_slice(&self.events[from..to]);
        }
    }

    /// Events whose start frame lies in `[start, end)`.
    pub(crate) fn starting_within(&self, start: Frame, end: Frame) -> &[Event] {
        let from = self.lower_bound_frame(start);
        let to = from + self.events[from..].partition_point(|e| e.frame() < end);
        &self.events[from..to]
    }

    /// Events whose start frame is exactly `frame`.
    fn starting_at(&self, frame: Frame) -> &[Event] {
        let from = self.lower_bound_frame(frame);
        let to = from + self.events[from..].partition_point(|e| e.frame() <= frame);
        &self.events[from..to]
    }

    fn covering(&self, frame: Frame) -> Vec<Event> {
        let mut cover: Vec<Event> = self
            .starting_at(frame)
            .iter()
            .filter(|e| !e.has_duration())
            .cloned()
            .collect();
        let active = self.seams.active_at(frame);
        self.expand_duplicates(active, &mut cover);
        cover
    }

    fn spanning(&self, start: Frame, end: Frame) -> Vec<Event> {
        let mut span: Vec<Event> = self
            .starting_within(start, end)
            .iter()
            .filter(|e| !e.has_duration())
            .cloned()
            .collect();
        // Only an empty query range can pick up seam events that fail this.
        let overlapping: BTreeSet<&Event> = self
            .seams
            .active_over(start, end)
            .into_iter()
            .filter(|e| e.frame() < end && e.end_frame() > start)
            .collect();
        self.expand_duplicates(overlapping, &mut span);
        span
    }

    fn within(&self, start: Frame, end: Frame, overspill: usize) -> Vec<Event> {
        let reference = self.lower_bound_frame(start);
        let first = reference.saturating_sub(overspill);
        let mut span: Vec<Event> = self.events[first..reference].to_vec();

        let mut after_last = reference;
        for (offset, event) in self.events[reference..]
            .iter()
            .take_while(|e| e.frame() < end)
            .enumerate()
        {
            if !event.has_duration() || event.end_frame() <= end {
                span.push(event.clone());
                after_last = reference + offset + 1;
            }
        }

        if overspill > 0 {
            let to = after_last.saturating_add(overspill).min(self.events.len());
            span.extend_from_slice(&self.events[after_last..to]);
        }
        span
    }

    fn end_frame(&self) -> Frame {
        if self.events.is_empty() {
            return 0;
        }
        self.seams
            .last_frame()
            .map_or(self.last_point_frame, |seam| seam.max(self.last_point_frame))
    }
}

/// A thread-safe, time-ordered multiset of [`Event`]s with interval queries.
///
/// Point events (no duration) are matched by their exact frame. Durational
/// events are active over the half-open range `[frame, frame + duration)`.
///
/// An event with a zero duration is active nowhere. It is only returned by
/// the start-based queries ([`events_within`](Self::events_within),
/// [`events_starting_within`](Self::events_starting_within) and
/// [`events_starting_at`](Self::events_starting_at)). In particular
/// [`events_spanning`](Self::events_spanning) leaves it out even when its
/// frame lies inside the queried range, unlike a point event there.
///
/// Query ranges whose end would pass [`Frame::MAX`] are clamped to it.
#[derive(Debug, Default)]
pub struct EventIndex {
    state: Mutex<Series>,
    export_id: OnceLock<u64>,
}

impl EventIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the index lock, recovering the state if a previous holder
    /// panicked.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Series> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) const fn export_id_cell(&self) -> &OnceLock<u64> {
        &self.export_id
    }

    /// Inserts an event after any events equal to it.
    pub fn add(&self, event: Event) {
        self.lock().add(event);
    }

    /// Removes one occurrence of an event equal to `event`.
    ///
    /// Removing an event that is not present does nothing.
    pub fn remove(&self, event: &Event) {
        self.lock().remove(event);
    }

    /// Removes every event.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn contains(&self, event: &Event) -> bool {
        let state = self.lock();
        state.events.get(state.lower_bound(event)) == Some(event)
    }

    pub fn count(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }

    /// Returns every event in sort order.
    pub fn all_events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    /// Events active at `frame`.
    ///
    /// Returns point events at exactly `frame`, followed by every durational
    /// event with `start <= frame < start + duration` (in sort order, with
    /// each duplicate repeated).
    pub fn events_covering(&self, frame: Frame) -> Vec<Event> {
        self.lock().covering(frame)
    }

    /// Events overlapping `[frame, frame + duration)`.
    ///
    /// Point events match when their frame lies in the range. Durational
    /// events match when they start before the range ends and end after it
    /// starts.
    pub fn events_spanning(&self, frame: Frame, duration: Frame) -> Vec<Event> {
        self.lock().spanning(frame, frame.saturating_add(duration))
    }

    /// Events wholly contained in `[frame, frame + duration)`.
    ///
    /// With a non-zero `overspill`, up to that many events immediately before
    /// the range, and up to that many events following the last contained
    /// event, are included as well.
    pub fn events_within(&self, frame: Frame, duration: Frame, overspill: usize) -> Vec<Event> {
        self.lock()
            .within(frame, frame.saturating_add(duration), overspill)
    }

    /// Events whose start frame lies in `[frame, frame + duration)`,
    /// whatever their duration.
    pub fn events_starting_within(&self, frame: Frame, duration: Frame) -> Vec<Event> {
        self.lock()
            .starting_within(frame, frame.saturating_add(duration))
            .to_vec()
    }

    /// Events starting at exactly `frame`.
    pub fn events_starting_at(&self, frame: Frame) -> Vec<Event> {
        self.lock().starting_at(frame).to_vec()
    }

    /// The event sorted immediately before `event`.
    ///
    /// Returns `None` if `event` is not present or is the first event.
    pub fn event_preceding(&self, event: &Event) -> Option<Event> {
        let state = self.lock();
        let at = state.lower_bound(event);
        if state.events.get(at) != Some(event) || at == 0 {
            return None;
        }
        Some(state.events[at - 1].clone())
    }

    /// The first event sorted after `event` and its duplicates.
    ///
    /// Returns `None` if `event` is not present or nothing follows it.
    pub fn event_following(&self, event: &Event) -> Option<Event> {
        let state = self.lock();
        if state.events.get(state.lower_bound(event)) != Some(event) {
            return None;
        }
        state.events.get(state.upper_bound(event)).cloned()
    }

    /// Finds the nearest event from `start_frame` satisfying `predicate`.
    ///
    /// A forward scan considers events at `start_frame` and later; a backward
    /// scan considers only events before `start_frame`. This is a linear scan.
    ///
    /// The predicate runs while the index lock is held. It must not call
    /// into this index, directly or indirectly: the lock is not reentrant and
    /// doing so will deadlock.
    pub fn nearest_event_matching(
        &self,
        start_frame: Frame,
        mut predicate: impl FnMut(&Event) -> bool,
        direction: Direction,
    ) -> Option<Event> {
        let state = self.lock();
        let at = state.lower_bound_frame(start_frame);
        match direction {
            Direction::Forward => state.events[at..].iter().find(|&e| predicate(e)).cloned(),
            Direction::Backward => state.events[..at]
                .iter()
                .rev()
                .find(|&e| predicate(e))
                .cloned(),
        }
    }

    /// Returns the event at position `index` in sort order.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn event_by_index(&self, index: usize) -> Event {
        let state = self.lock();
        assert!(
            index < state.events.len(),
            "event index {index} out of range for {} events",
            state.events.len()
        );
        state.events[index].clone()
    }

    /// Position at which `event` is, or would be, stored.
    pub fn index_for_event(&self, event: &Event) -> usize {
        self.lock().lower_bound(event)
    }

    /// Frame of the earliest event, or 0 if the index is empty.
    pub fn start_frame(&self) -> Frame {
        self.lock().events.first().map_or(0, Event::frame)
    }

    /// Frame just after the latest event ends, or 0 if the index is empty.
    pub fn end_frame(&self) -> Frame {
        self.lock().end_frame()
    }
}

impl Clone for EventIndex {
    /// Copies the contents under the source's lock. The copy is a distinct
    /// collection and receives its own export id when first serialized.
    fn clone(&self) -> Self {
        Self {
            state: Mutex::new(self.lock().clone()),
            export_id: OnceLock::new(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        let snapshot = source.lock().clone();
        *self.lock() = snapshot;
    }
}

impl FromIterator<Event> for EventIndex {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        let index = Self::new();
        {
            let mut state = index.lock();
            for event in iter {
                state.add(event);
            }
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn labels(events: &[Event]) -> Vec<&str> {
        events.iter().map(Event::label).collect()
    }

    fn seam_snapshot(index: &EventIndex) -> Vec<(Frame, Vec<Event>)> {
        index
            .lock()
            .seams
            .iter()
            .map(|(frame, active)| {
                let mut active = active.to_vec();
                active.sort();
                (frame, active)
            })
            .collect()
    }

    #[test]
    fn add_keeps_events_sorted() {
        let index = EventIndex::new();
        index.add(Event::labelled(30, "c"));
        index.add(Event::labelled(10, "a"));
        index.add(Event::durational(20, 1.0, 5, "b"));
        assert_eq!(labels(&index.all_events()), vec!["a", "b", "c"]);
        assert_eq!(index.count(), 3);
        assert!(!index.is_empty());
    }

    #[test]
    fn half_open_boundary() {
        let index = EventIndex::new();
        let b = Event::durational(20, 1.0, 5, "B");
        index.add(b.clone());
        assert_eq!(index.events_covering(24), vec![b]);
        assert!(index.events_covering(25).is_empty());
        assert!(index.events_covering(19).is_empty());
    }

    #[test]
    fn covering_returns_points_then_durational() {
        let index = EventIndex::new();
        index.add(Event::durational(0, 0.0, 100, "long"));
        index.add(Event::labelled(50, "point"));
        index.add(Event::labelled(51, "other"));
        assert_eq!(labels(&index.events_covering(50)), vec!["point", "long"]);
    }

    #[test]
    fn covering_expands_duplicates() {
        let index = EventIndex::new();
        let region = Event::durational(10, 1.0, 10, "r");
        index.add(region.clone());
        index.add(region.clone());
        index.add(Event::labelled(15, "p"));
        index.add(Event::labelled(15, "p"));
        assert_eq!(labels(&index.events_covering(15)), vec!["p", "p", "r", "r"]);
    }

    #[test]
    fn spanning_versus_within() {
        let index = EventIndex::new();
        index.add(Event::labelled(0, "start"));
        index.add(Event::durational(10, 0.0, 20, "region"));

        let within = index.events_within(5, 20, 0);
        assert!(within.is_empty(), "region ends after the range, start precedes it");

        let within = index.events_within(5, 20, 1);
        assert_eq!(labels(&within), vec!["start", "region"]);

        let within = index.events_within(0, 20, 0);
        assert_eq!(labels(&within), vec!["start"]);

        let spanning = index.events_spanning(0, 20);
        assert_eq!(labels(&spanning), vec!["start", "region"]);

        let spanning = index.events_spanning(5, 20);
        assert_eq!(labels(&spanning), vec!["region"]);
    }

    #[test]
    fn spanning_excludes_events_ending_at_range_start() {
        let index = EventIndex::new();
        index.add(Event::durational(0, 0.0, 10, "before"));
        index.add(Event::durational(20, 0.0, 10, "after"));
        assert!(index.events_spanning(10, 10).is_empty());
        assert_eq!(labels(&index.events_spanning(10, 11)), vec!["after"]);
    }

    #[test]
    fn spanning_with_empty_range() {
        let index = EventIndex::new();
        index.add(Event::durational(0, 0.0, 10, "a"));
        index.add(Event::durational(5, 0.0, 10, "b"));
        index.add(Event::labelled(5, "p"));
        // [5, 5) holds no frames: only events straddling frame 5 overlap it.
        assert_eq!(labels(&index.events_spanning(5, 0)), vec!["a"]);
    }

    #[test]
    fn within_includes_contained_events_only() {
        let index = EventIndex::new();
        index.add(Event::durational(10, 0.0, 5, "inside"));
        index.add(Event::durational(12, 0.0, 20, "overhang"));
        index.add(Event::labelled(19, "point"));
        index.add(Event::labelled(20, "edge"));
        assert_eq!(
            labels(&index.events_within(10, 10, 0)),
            vec!["inside", "point"]
        );
    }

    #[test]
    fn within_overspill_adds_neighbours() {
        let index: EventIndex = (0..10)
            .map(|i| Event::labelled(i * 10, format!("e{i}")))
            .collect();
        assert_eq!(labels(&index.events_within(30, 20, 0)), vec!["e3", "e4"]);
        assert_eq!(
            labels(&index.events_within(30, 20, 1)),
            vec!["e2", "e3", "e4", "e5"]
        );
        assert_eq!(
            labels(&index.events_within(10, 10, 3)),
            vec!["e0", "e1", "e2", "e3", "e4"]
        );
        assert_eq!(
            labels(&index.events_within(80, 100, 2)),
            vec!["e6", "e7", "e8", "e9"]
        );
    }

    #[test]
    fn starting_within_ignores_duration() {
        let index = EventIndex::new();
        index.add(Event::durational(0, 0.0, 50, "early"));
        index.add(Event::durational(10, 0.0, 50, "long"));
        index.add(Event::labelled(19, "point"));
        index.add(Event::labelled(20, "late"));
        assert_eq!(
            labels(&index.events_starting_within(10, 10)),
            vec!["long", "point"]
        );
        assert_eq!(labels(&index.events_starting_at(20)), vec!["late"]);
    }

    #[test]
    fn zero_duration_events_occupy_no_span() {
        let index = EventIndex::new();
        let instant = Event::durational(40, 1.0, 0, "instant");
        index.add(instant.clone());
        assert!(index.events_covering(40).is_empty());
        assert!(index.events_spanning(0, 100).is_empty());
        assert_eq!(index.events_within(0, 100, 0), vec![instant.clone()]);
        assert_eq!(index.end_frame(), 40);
        assert!(seam_snapshot(&index).is_empty());

        index.remove(&instant);
        assert!(index.is_empty());
        assert_eq!(index.end_frame(), 0);
    }

    #[test]
    fn duplicates_need_matching_removals() {
        let index = EventIndex::new();
        let e = Event::durational(10, 1.0, 10, "dup");
        for _ in 0..3 {
            index.add(e.clone());
        }
        assert_eq!(index.count(), 3);

        index.remove(&e);
        assert!(index.contains(&e));
        assert_eq!(index.events_covering(12).len(), 2);
        index.remove(&e);
        assert!(index.contains(&e));
        index.remove(&e);
        assert!(!index.contains(&e));
        assert!(index.is_empty());
        assert!(seam_snapshot(&index).is_empty());
    }

    #[test]
    fn seams_record_duplicates_once() {
        let index = EventIndex::new();
        let e = Event::durational(0, 1.0, 10, "dup");
        index.add(e.clone());
        index.add(e.clone());
        assert_eq!(seam_snapshot(&index), vec![(0, vec![e]), (10, vec![])]);
    }

    #[test]
    fn remove_absent_event_is_noop() {
        let index = EventIndex::new();
        index.add(Event::labelled(5, "a"));
        index.remove(&Event::labelled(5, "b"));
        index.remove(&Event::durational(5, 0.0, 3, "a"));
        assert_eq!(labels(&index.all_events()), vec!["a"]);
    }

    #[test]
    fn add_remove_round_trip_restores_seams() {
        let index = EventIndex::new();
        index.add(Event::durational(0, 0.0, 30, "a"));
        index.add(Event::durational(10, 0.0, 30, "b"));
        index.add(Event::labelled(12, "p"));
        let events = index.all_events();
        let seams = seam_snapshot(&index);
        let end = index.end_frame();

        for extra in [
            Event::durational(5, 0.0, 50, "c"),
            Event::durational(0, 0.0, 30, "a"),
            Event::durational(-20, 0.0, 5, "early"),
            Event::labelled(100, "late"),
            Event::labelled(12, "p"),
        ] {
            index.add(extra.clone());
            index.remove(&extra);
            assert_eq!(index.all_events(), events);
            assert_eq!(seam_snapshot(&index), seams, "after round trip of {extra:?}");
            assert_eq!(index.end_frame(), end);
        }
    }

    #[test]
    fn end_frame_tracks_maximum_through_removal() {
        let index = EventIndex::new();
        assert_eq!(index.end_frame(), 0);
        index.add(Event::labelled(50, "p"));
        index.add(Event::durational(10, 0.0, 30, "r"));
        assert_eq!(index.end_frame(), 50);
        index.add(Event::labelled(70, "q"));
        assert_eq!(index.end_frame(), 70);
        index.remove(&Event::labelled(70, "q"));
        assert_eq!(index.end_frame(), 50);
        index.remove(&Event::labelled(50, "p"));
        assert_eq!(index.end_frame(), 40);
        index.remove(&Event::durational(10, 0.0, 30, "r"));
        assert_eq!(index.end_frame(), 0);
    }

    #[test]
    fn start_frame_is_earliest_event() {
        let index = EventIndex::new();
        assert_eq!(index.start_frame(), 0);
        index.add(Event::labelled(40, "b"));
        index.add(Event::durational(15, 0.0, 100, "a"));
        assert_eq!(index.start_frame(), 15);
    }

    #[test]
    fn preceding_and_following_skip_duplicates() {
        let index = EventIndex::new();
        let a = Event::labelled(1, "a");
        let b = Event::labelled(2, "b");
        let c = Event::labelled(3, "c");
        index.add(a.clone());
        index.add(b.clone());
        index.add(b.clone());
        index.add(c.clone());

        assert_eq!(index.event_preceding(&b), Some(a.clone()));
        assert_eq!(index.event_following(&b), Some(c.clone()));
        assert_eq!(index.event_preceding(&a), None);
        assert_eq!(index.event_following(&c), None);
        assert_eq!(index.event_following(&Event::labelled(2, "missing")), None);
    }

    #[test]
    fn nearest_matching_scans_in_direction() {
        let index: EventIndex = [
            Event::labelled(0, "x"),
            Event::labelled(10, "target"),
            Event::labelled(20, "x"),
            Event::labelled(30, "target"),
        ]
        .into_iter()
        .collect();
        let is_target = |e: &Event| e.label() == "target";

        let found = index.nearest_event_matching(10, is_target, Direction::Forward);
        assert_eq!(found.map(|e| e.frame()), Some(10));

        let found = index.nearest_event_matching(11, is_target, Direction::Forward);
        assert_eq!(found.map(|e| e.frame()), Some(30));

        let found = index.nearest_event_matching(30, is_target, Direction::Backward);
        assert_eq!(found.map(|e| e.frame()), Some(10));

        let found = index.nearest_event_matching(10, is_target, Direction::Backward);
        assert_eq!(found, None);

        let found = index.nearest_event_matching(31, is_target, Direction::Forward);
        assert_eq!(found, None);
    }

    #[test]
    fn positional_access() {
        let index: EventIndex = [Event::labelled(5, "b"), Event::labelled(1, "a")]
            .into_iter()
            .collect();
        assert_eq!(index.event_by_index(0).label(), "a");
        assert_eq!(index.event_by_index(1).label(), "b");
        assert_eq!(index.index_for_event(&Event::labelled(5, "b")), 1);
        assert_eq!(index.index_for_event(&Event::labelled(3, "new")), 1);
        assert_eq!(index.index_for_event(&Event::labelled(9, "new")), 2);
    }

    #[test]
    #[should_panic(expected = "event index 2 out of range for 2 events")]
    fn event_by_index_out_of_range_panics() {
        let index: EventIndex = [Event::new(0), Event::new(1)].into_iter().collect();
        let _ = index.event_by_index(2);
    }

    #[test]
    fn clear_resets_everything() {
        let index = EventIndex::new();
        index.add(Event::labelled(100, "p"));
        index.add(Event::durational(0, 0.0, 10, "r"));
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.end_frame(), 0);
        assert!(seam_snapshot(&index).is_empty());
        index.add(Event::labelled(3, "q"));
        assert_eq!(index.end_frame(), 3);
    }

    #[test]
    fn clone_is_an_independent_snapshot() {
        let index = EventIndex::new();
        index.add(Event::durational(0, 0.0, 10, "r"));
        let copy = index.clone();
        index.add(Event::labelled(5, "later"));
        assert_eq!(copy.count(), 1);
        assert_eq!(labels(&copy.events_covering(5)), vec!["r"]);

        let mut target = EventIndex::new();
        target.clone_from(&index);
        assert_eq!(target.all_events(), index.all_events());
    }

    #[test]
    fn spans_ending_at_last_frame() {
        let index = EventIndex::new();
        let late = Event::durational(Frame::MAX - 10, 0.0, 10, "late");
        let moved = Event::durational(0, 0.0, 10, "moved").with_frame(Frame::MAX - 3);
        index.add(late.clone());
        index.add(moved.clone());

        assert_eq!(index.end_frame(), Frame::MAX);
        assert_eq!(
            labels(&index.events_covering(Frame::MAX - 1)),
            vec!["late", "moved"]
        );
        assert!(index.events_covering(Frame::MAX).is_empty());
        assert_eq!(
            labels(&index.events_spanning(Frame::MAX - 5, 100)),
            vec!["late", "moved"]
        );

        index.remove(&late);
        index.remove(&moved);
        assert!(index.is_empty());
        assert!(seam_snapshot(&index).is_empty());
    }

    #[test]
    fn point_at_last_frame_is_covered() {
        let index = EventIndex::new();
        index.add(Event::labelled(Frame::MAX, "edge"));
        index.add(Event::labelled(Frame::MAX - 1, "before"));

        assert_eq!(labels(&index.events_covering(Frame::MAX)), vec!["edge"]);
        assert_eq!(labels(&index.events_starting_at(Frame::MAX)), vec!["edge"]);
        // The range end clamps to the last frame, which stays exclusive.
        assert_eq!(
            labels(&index.events_starting_within(Frame::MAX - 1, 10)),
            vec!["before"]
        );
        assert_eq!(index.end_frame(), Frame::MAX);
    }

    #[test]
    fn overspill_larger_than_index() {
        let index: EventIndex = [
            Event::labelled(0, "a"),
            Event::labelled(5, "b"),
            Event::labelled(20, "c"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            labels(&index.events_within(3, 10, usize::MAX)),
            vec!["a", "b", "c"]
        );
        assert_eq!(
            labels(&index.events_within(-100, Frame::MAX, 0)),
            vec!["a", "b", "c"]
        );
    }

    fn span_event() -> impl Strategy<Value = Event> {
        (
            0..60_i64,
            prop_oneof![Just(None), (0..25_i64).prop_map(Some)],
            0..3_usize,
        )
            .prop_map(|(frame, duration, label)| {
                let event = Event::labelled(frame, ["a", "b", "c"][label]);
                match duration {
                    Some(duration) => event.with_duration(duration),
                    None => event,
                }
            })
    }

    #[derive(Debug, Clone)]
    enum Edit {
        Add(Event),
        Remove(prop::sample::Index),
    }

    fn edit() -> impl Strategy<Value = Edit> {
        prop_oneof![
            3 => span_event().prop_map(Edit::Add),
            2 => any::<prop::sample::Index>().prop_map(Edit::Remove),
        ]
    }

    /// Seams with their distinct events sorted.
    fn seams_of(series: &Series) -> Vec<(Frame, Vec<Event>)> {
        series
            .seams
            .iter()
            .map(|(frame, active)| {
                let mut active = active.to_vec();
                active.sort();
                (frame, active)
            })
            .collect()
    }

    fn check_seams(series: &Series, model: &[Event]) -> Result<(), TestCaseError> {
        let seams = seams_of(series);

        for (frame, active) in &seams {
            let mut expected: Vec<Event> = model
                .iter()
                .filter(|e| e.occupies_span() && e.frame() <= *frame && *frame < e.end_frame())
                .cloned()
                .collect();
            expected.sort();
            expected.dedup();
            prop_assert_eq!(active, &expected, "seam at {}", frame);
        }

        for event in model.iter().filter(|e| e.occupies_span()) {
            for boundary in [event.frame(), event.end_frame()] {
                prop_assert!(
                    seams.iter().any(|(frame, _)| *frame == boundary),
                    "no seam at {} for {:?}",
                    boundary,
                    event
                );
            }
        }

        for pair in seams.windows(2) {
            prop_assert_ne!(&pair[0].1, &pair[1].1, "redundant seam at {}", pair[1].0);
        }

        if let Some((frame, active)) = seams.first() {
            prop_assert!(!active.is_empty(), "leading empty seam at {}", frame);
        }
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

        #[test]
        fn seams_match_active_sets_after_every_edit(
            edits in prop::collection::vec(edit(), 1..80),
        ) {
            let mut series = Series::default();
            let mut model: Vec<Event> = Vec::new();
            for edit in edits {
                match edit {
                    Edit::Add(event) => {
                        series.add(event.clone());
                        model.push(event);
                    }
                    Edit::Remove(pick) => {
                        if model.is_empty() {
                            continue;
                        }
                        let event = model.remove(pick.index(model.len()));
                        series.remove(&event);
                    }
                }
                check_seams(&series, &model)?;
            }
        }

        #[test]
        fn add_then_remove_restores_seams(
            existing in prop::collection::vec(span_event(), 0..30),
            extra in span_event(),
        ) {
            let mut series = Series::default();
            for event in existing {
                series.add(event);
            }
            let seams_before = seams_of(&series);
            let events_before = series.events.clone();
            let end_before = series.end_frame();

            series.add(extra.clone());
            series.remove(&extra);

            prop_assert_eq!(seams_of(&series), seams_before);
            prop_assert_eq!(&series.events, &events_before);
            prop_assert_eq!(series.end_frame(), end_before);
        }
    }
}
