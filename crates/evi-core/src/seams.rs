//! Seam map: snapshots of the active durational events.
//!
//! A seam is a frame at which the set of active durational events may change.
//! Each seam holds the full set of events active from that frame up to the
//! next seam, so the events covering any frame can be read from the seam at
//! or before it without looking further back.
//!
//! Only events that occupy a span (positive duration) are recorded here, and
//! each distinct event is recorded once regardless of how many duplicates
//! the owning index holds.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::Bound;

use crate::event::{Event, Frame};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SeamMap {
    seams: BTreeMap<Frame, Vec<Event>>,
}

impl SeamMap {
    /// Records a durational event that is not yet present in the map.
    pub(crate) fn insert(&mut self, event: &Event) {
        let start = event.frame();
        let end = event.end_frame();
        self.create_seam(start);
        self.create_seam(end);
        self.walk_span(start, end, |active| active.push(event.clone()));
    }

    /// Removes the last copy of a durational event, then prunes seams that
    /// no longer mark a change.
    pub(crate) fn remove(&mut self, event: &Event) {
        let start = event.frame();
        let end = event.end_frame();
        if !self.seams.contains_key(&start) || !self.seams.contains_key(&end) {
            tracing::error!(start, end, "seam map is missing a boundary for a present event");
            panic!("seam map has no boundary seams for event spanning {start}..{end}");
        }
        self.walk_span(start, end, |active| active.retain(|e| e != event));
        self.prune(start, end);
    }

    pub(crate) fn clear(&mut self) {
        self.seams.clear();
    }

    /// Frame of the final seam, which is the end of the latest-ending event.
    pub(crate) fn last_frame(&self) -> Option<Frame> {
        self.seams.last_key_value().map(|(&frame, _)| frame)
    }

    /// Events active at `frame`, read from the seam at or before it.
    pub(crate) fn active_at(&self, frame: Frame) -> BTreeSet<&Event> {
        self.seams
            .range(..=frame)
            .next_back()
            .map(|(_, active)| active.iter().collect())
            .unwrap_or_default()
    }

    /// Distinct events active anywhere in `[start, end)`.
    pub(crate) fn active_over(&self, start: Frame, end: Frame) -> BTreeSet<&Event> {
        let mut found = self.active_at(start);
        if end > start {
            let later = self
                .seams
                .range((Bound::Excluded(start), Bound::Excluded(end)))
                .flat_map(|(_, active)| active.iter());
            found.extend(later);
        }
        found
    }

    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (Frame, &[Event])> {
        self.seams
            .iter()
            .map(|(&frame, active)| (frame, active.as_slice()))
    }

    /// Ensures a seam exists at `frame`, seeding it from the seam before it.
    fn create_seam(&mut self, frame: Frame) {
        if self.seams.contains_key(&frame) {
            return;
        }
        let seed = self
            .seams
            .range(..frame)
            .next_back()
            .map(|(_, active)| active.clone())
            .unwrap_or_default();
        self.seams.insert(frame, seed);
    }

    /// Applies `f` to every seam from `start` up to, but excluding, the seam
    /// at `end`. Both seams must exist.
    fn walk_span(&mut self, start: Frame, end: Frame, mut f: impl FnMut(&mut Vec<Event>)) {
        let mut reached_end = false;
        for (&frame, active) in self.seams.range_mut(start..) {
            if frame == end {
                reached_end = true;
                break;
            }
            f(active);
        }
        if !reached_end {
            tracing::error!(start, end, "reached end of seam map before end seam");
            panic!("reached end of seam map before end seam at frame {end}");
        }
    }

    /// Drops seams in `[pred(start), end]` that repeat their predecessor,
    /// then drops any leading empty seams.
    fn prune(&mut self, start: Frame, end: Frame) {
        let from = self
            .seams
            .range(..start)
            .next_back()
            .map_or(start, |(&frame, _)| frame);

        let mut redundant = Vec::new();
        let mut previous: Option<&Vec<Event>> = None;
        for (&frame, active) in self.seams.range(from..=end) {
            if previous.is_some_and(|p| same_events(p, active)) {
                redundant.push(frame);
            }
            previous = Some(active);
        }
        for frame in redundant {
            self.seams.remove(&frame);
        }

        while let Some(first) = self.seams.first_entry() {
            if !first.get().is_empty() {
                break;
            }
            first.remove();
        }
    }
}

/// Seams never hold the same event twice, so equal length plus containment
/// is set equality.
fn same_events(a: &[Event], b: &[Event]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let set: HashSet<&Event> = a.iter().collect();
    b.iter().all(|e| set.contains(e))
}
