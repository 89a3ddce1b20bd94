//! Ordered breaks of one axis and the cumulative mapping built from them.
//!
//! [`BreakSet`] owns the breaks and enforces the non-overlap rule on every mutation.
//! The mapping itself lives in a [`BreakIndex`], rebuilt lazily on the first query after a
//! mutation so that a batch of edits costs a single rebuild.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::breaks::{Break, BreakId, DateBreak};
use crate::data_types::AxisId;
use crate::error::BreakError;
use crate::invalidation::{Invalidation, InvalidationSink, PendingInvalidation};

/// A normalized break in index form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakSegment {
    pub id: BreakId,
    pub start: f64,
    pub end: f64,
    pub break_size: f64,
    /// Total collapse of ALL breaks preceding this one (excluding this one).
    pub cumulative_before: f64,
}

impl BreakSegment {
    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    pub fn collapse(&self) -> f64 {
        self.width() * (1.0 - self.break_size)
    }

    /// Position of the break's start in compressed space.
    pub fn compressed_start(&self) -> f64 {
        self.start - self.cumulative_before
    }

    /// Position of the break's end in compressed space.
    pub fn compressed_end(&self) -> f64 {
        self.compressed_start() + self.width() * self.break_size
    }
}

impl From<&Break> for BreakSegment {
    fn from(brk: &Break) -> Self {
        Self {
            id: brk.id(),
            start: brk.start_value(),
            end: brk.end_value(),
            break_size: brk.break_size(),
            cumulative_before: 0.0,
        }
    }
}

/// Raw value <-> compressed position transformation over a set of breaks.
#[derive(Debug, Default, Clone)]
pub struct BreakIndex {
    segments: Vec<BreakSegment>,
    total_collapse: f64,
}

impl BreakIndex {
    /// Sorts the segments, checks they do not overlap and accumulates their collapse.
    pub fn new(mut segments: Vec<BreakSegment>) -> Result<Self, BreakError> {
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));

        for pair in segments.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.start < prev.end {
                return Err(BreakError::Overlap {
                    id: next.id,
                    start: next.start,
                    end: next.end,
                    other: prev.id,
                    other_start: prev.start,
                    other_end: prev.end,
                });
            }
        }

        let mut cumulative = 0.0;
        for segment in segments.iter_mut() {
            segment.cumulative_before = cumulative;
            cumulative += segment.collapse();
        }

        Ok(Self {
            segments,
            total_collapse: cumulative,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[BreakSegment] {
        &self.segments
    }

    /// Sum of the collapse of every break.
    pub fn total_collapse(&self) -> f64 {
        self.total_collapse
    }

    /// Last segment starting at or before `raw`.
    fn segment_at(&self, raw: f64) -> Option<&BreakSegment> {
        let idx = self.segments.partition_point(|s| s.start <= raw);
        idx.checked_sub(1).map(|i| &self.segments[i])
    }

    /// Converts a raw scale value to its compressed position.
    pub fn map_value(&self, raw: f64) -> f64 {
        match self.segment_at(raw) {
            None => raw,
            Some(seg) if raw < seg.end => {
                seg.compressed_start() + (raw - seg.start) * seg.break_size
            }
            Some(seg) => raw - (seg.cumulative_before + seg.collapse()),
        }
    }

    /// Converts a compressed position back to a raw value.
    ///
    /// The single point a fully collapsed break maps to converts back to the break's end.
    pub fn invert(&self, compressed: f64) -> f64 {
        // compressed_start is non-decreasing because breaks never overlap.
        let idx = self
            .segments
            .partition_point(|s| s.compressed_start() <= compressed);
        match idx.checked_sub(1).map(|i| &self.segments[i]) {
            None => compressed,
            Some(seg) if compressed < seg.compressed_end() => {
                seg.start + (compressed - seg.compressed_start()) / seg.break_size
            }
            Some(seg) => compressed + seg.cumulative_before + seg.collapse(),
        }
    }

    /// Checks if a value falls inside a break.
    pub fn is_inside(&self, raw: f64) -> bool {
        self.segment_at(raw).is_some_and(|s| raw < s.end)
    }

    /// Checks if a value falls inside a fully collapsed break, i.e. is not drawable.
    pub fn is_hidden(&self, raw: f64) -> bool {
        self.segment_at(raw)
            .is_some_and(|s| raw < s.end && s.break_size == 0.0)
    }

    /// Splits a raw range [start, end] into sub-ranges that do not overlap any break.
    pub fn split_range(&self, start: f64, end: f64) -> Vec<(f64, f64)> {
        if self.segments.is_empty() {
            return vec![(start, end)];
        }

        let mut result = Vec::new();
        let mut current_start = start;

        for seg in &self.segments {
            if seg.end <= current_start {
                continue;
            }
            if seg.start >= end {
                break;
            }
            if seg.start > current_start {
                result.push((current_start, seg.start));
            }
            current_start = seg.end;
        }

        if current_start < end {
            result.push((current_start, end));
        }

        result
    }

    /// Returns a stateful cursor for sequential access.
    pub fn cursor(&self) -> BreakCursor<'_> {
        BreakCursor::new(self)
    }
}

/// A stateful cursor for monotonically increasing inputs (O(1) amortized per call).
///
/// A cursor walks one direction per pass: call [`BreakCursor::reset`] before switching
/// between [`BreakCursor::map_value`] and [`BreakCursor::invert`].
#[derive(Debug)]
pub struct BreakCursor<'a> {
    index: &'a BreakIndex,
    next: usize,
}

impl<'a> BreakCursor<'a> {
    pub fn new(index: &'a BreakIndex) -> Self {
        Self { index, next: 0 }
    }

    pub fn map_value(&mut self, raw: f64) -> f64 {
        let segments = &self.index.segments;

        while self.next < segments.len() && segments[self.next].end <= raw {
            self.next += 1;
        }

        let Some(current) = segments.get(self.next) else {
            return raw - self.index.total_collapse;
        };
        if raw < current.start {
            raw - current.cumulative_before
        } else {
            current.compressed_start() + (raw - current.start) * current.break_size
        }
    }

    pub fn invert(&mut self, compressed: f64) -> f64 {
        let segments = &self.index.segments;

        while self.next < segments.len() && segments[self.next].compressed_start() <= compressed {
            self.next += 1;
        }

        // `next` is the first segment starting after `compressed`.
        let Some(prev) = self.next.checked_sub(1).map(|i| &segments[i]) else {
            return compressed;
        };
        if compressed < prev.compressed_end() {
            prev.start + (compressed - prev.compressed_start()) / prev.break_size
        } else {
            compressed + prev.cumulative_before + prev.collapse()
        }
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// The breaks of one axis, ordered by start and never overlapping.
#[derive(Debug)]
pub struct BreakSet {
    axis: AxisId,
    breaks: Vec<Break>,
    index: Mutex<Option<Arc<BreakIndex>>>,
}

impl BreakSet {
    pub fn new(axis: AxisId) -> Self {
        Self {
            axis,
            breaks: Vec::new(),
            index: Mutex::new(None),
        }
    }

    pub fn axis(&self) -> AxisId {
        self.axis
    }

    pub fn len(&self) -> usize {
        self.breaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breaks.is_empty()
    }

    /// Breaks in ascending start order.
    pub fn iter(&self) -> impl Iterator<Item = &Break> {
        self.breaks.iter()
    }

    pub fn get(&self, id: BreakId) -> Option<&Break> {
        self.breaks.iter().find(|b| b.id() == id)
    }

    pub fn contains(&self, id: BreakId) -> bool {
        self.get(id).is_some()
    }

    /// Attaches `brk` to this set's axis.
    ///
    /// Fails with [`BreakError::AlreadyAttached`] if `brk` still belongs to a set, and with
    /// [`BreakError::Overlap`] if `[start, end)` intersects a contained break. The set is
    /// untouched on failure.
    pub fn add(
        &mut self,
        brk: impl Into<Break>,
        sink: &mut dyn InvalidationSink,
    ) -> Result<BreakId, BreakError> {
        let mut brk = brk.into();
        if let Some(axis) = brk.axis() {
            return Err(BreakError::AlreadyAttached { id: brk.id(), axis });
        }
        self.check_overlap(&brk, None)?;

        brk.numeric_mut().attach(self.axis);
        let id = brk.id();
        debug!(axis = ?self.axis, %id, start = brk.start_value(), end = brk.end_value(), "break added");
        self.insert_sorted(brk);
        self.invalidate_index();
        Invalidation::ALL.emit(self.axis, sink);
        Ok(id)
    }

    /// Detaches the break with `id` and hands it back to the caller.
    pub fn remove(
        &mut self,
        id: BreakId,
        sink: &mut dyn InvalidationSink,
    ) -> Result<Break, BreakError> {
        let idx = self.position(id)?;
        let mut brk = self.breaks.remove(idx);
        brk.numeric_mut().detach();
        debug!(axis = ?self.axis, %id, "break removed");
        self.invalidate_index();
        Invalidation::ALL.emit(self.axis, sink);
        Ok(brk)
    }

    /// Detaches every break.
    pub fn clear(&mut self, sink: &mut dyn InvalidationSink) -> Vec<Break> {
        let mut removed = std::mem::take(&mut self.breaks);
        if removed.is_empty() {
            return removed;
        }
        for brk in removed.iter_mut() {
            brk.numeric_mut().detach();
        }
        self.invalidate_index();
        Invalidation::ALL.emit(self.axis, sink);
        removed
    }

    /// Mutates one contained break.
    ///
    /// `edit` runs on a draft copy. The draft is committed only if `edit` succeeds and the
    /// new bounds do not overlap another break; invalidation marks raised by `edit` reach
    /// `sink` only after the commit.
    pub fn update<F>(
        &mut self,
        id: BreakId,
        sink: &mut dyn InvalidationSink,
        edit: F,
    ) -> Result<(), BreakError>
    where
        F: FnOnce(&mut Break, &mut dyn InvalidationSink) -> Result<(), BreakError>,
    {
        let idx = self.position(id)?;
        let mut draft = self.breaks[idx].duplicate();
        let mut pending = PendingInvalidation::default();
        edit(&mut draft, &mut pending)?;

        if draft.id() != id || draft.axis() != Some(self.axis) {
            return Err(BreakError::InvalidRange(format!(
                "an edit of break {id} must not replace the break itself"
            )));
        }
        self.check_overlap(&draft, Some(id))?;

        self.breaks.remove(idx);
        self.insert_sorted(draft);
        // `edit` may have changed the draft without reporting it to `pending`.
        self.invalidate_index();
        pending.flush(sink);
        Ok(())
    }

    /// Index reflecting the current breaks, rebuilt if a mutation happened since the last
    /// query.
    pub fn index(&self) -> Arc<BreakIndex> {
        let mut cache = self.index.lock();
        if let Some(index) = cache.as_ref() {
            return index.clone();
        }

        let segments = self.breaks.iter().map(BreakSegment::from).collect();
        let index = match BreakIndex::new(segments) {
            Ok(index) => Arc::new(index),
            Err(err) => {
                error!(axis = ?self.axis, %err, "break set holds overlapping breaks");
                Arc::new(BreakIndex::default())
            }
        };
        debug!(axis = ?self.axis, breaks = self.breaks.len(), "break index rebuilt");
        *cache = Some(index.clone());
        index
    }

    /// Whether the next query will rebuild the index.
    pub fn is_index_stale(&self) -> bool {
        self.index.lock().is_none()
    }

    pub fn map_value(&self, raw: f64) -> f64 {
        self.index().map_value(raw)
    }

    pub fn invert(&self, compressed: f64) -> f64 {
        self.index().invert(compressed)
    }

    pub fn is_inside(&self, raw: f64) -> bool {
        self.index().is_inside(raw)
    }

    pub fn split_range(&self, start: f64, end: f64) -> Vec<(f64, f64)> {
        self.index().split_range(start, end)
    }

    /// Date breaks, for the tick generator to refresh their grid caches.
    pub(crate) fn date_breaks_mut(&mut self) -> impl Iterator<Item = &mut DateBreak> {
        self.breaks.iter_mut().filter_map(Break::as_date_mut)
    }

    fn position(&self, id: BreakId) -> Result<usize, BreakError> {
        self.breaks
            .iter()
            .position(|b| b.id() == id)
            .ok_or(BreakError::NotFound(id))
    }

    fn check_overlap(&self, candidate: &Break, skip: Option<BreakId>) -> Result<(), BreakError> {
        let (start, end) = (candidate.start_value(), candidate.end_value());
        match self
            .breaks
            .iter()
            .filter(|b| Some(b.id()) != skip)
            .find(|b| b.overlaps(start, end))
        {
            Some(other) => Err(BreakError::Overlap {
                id: candidate.id(),
                start,
                end,
                other: other.id(),
                other_start: other.start_value(),
                other_end: other.end_value(),
            }),
            None => Ok(()),
        }
    }

    fn insert_sorted(&mut self, brk: Break) {
        let pos = self
            .breaks
            .partition_point(|b| b.start_value() < brk.start_value());
        self.breaks.insert(pos, brk);
    }

    fn invalidate_index(&self) {
        *self.index.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaks::NumericBreak;
    use crate::invalidation::NoopSink;

    fn segment(start: f64, end: f64, break_size: f64) -> BreakSegment {
        BreakSegment {
            id: BreakId(0),
            start,
            end,
            break_size,
            cumulative_before: 0.0,
        }
    }

    fn set_with(breaks: &[(f64, f64, f64)]) -> BreakSet {
        let mut set = BreakSet::new(AxisId(0));
        for &(start, end, size) in breaks {
            set.add(NumericBreak::with_size(start, end, size).unwrap(), &mut NoopSink)
                .unwrap();
        }
        set
    }

    #[test]
    fn test_index_rejects_overlap() {
        let err = BreakIndex::new(vec![segment(100.0, 200.0, 0.0), segment(150.0, 250.0, 0.0)])
            .unwrap_err();
        assert!(matches!(err, BreakError::Overlap { .. }));

        // Touching breaks are fine.
        let index =
            BreakIndex::new(vec![segment(200.0, 300.0, 0.0), segment(100.0, 200.0, 0.0)]).unwrap();
        assert_eq!(index.segments()[0].start, 100.0);
        assert_eq!(index.total_collapse(), 200.0);
    }

    #[test]
    fn test_mapping() {
        // Break of 100 between 100 and 200
        let set = set_with(&[(100.0, 200.0, 0.0)]);

        assert_eq!(set.map_value(50.0), 50.0);
        assert_eq!(set.invert(50.0), 50.0);

        assert_eq!(set.map_value(150.0), 100.0);

        assert_eq!(set.map_value(250.0), 150.0);
        assert_eq!(set.invert(150.0), 250.0);
    }

    #[test]
    fn test_partial_compression() {
        let set = set_with(&[(100.0, 200.0, 0.5), (300.0, 400.0, 0.0)]);

        assert_eq!(set.map_value(150.0), 125.0);
        assert_eq!(set.map_value(200.0), 150.0);
        assert_eq!(set.map_value(250.0), 200.0);
        assert_eq!(set.map_value(350.0), 250.0);
        assert_eq!(set.map_value(500.0), 350.0);

        assert_eq!(set.invert(125.0), 150.0);
        assert_eq!(set.invert(200.0), 250.0);
        assert_eq!(set.invert(250.0), 400.0);
        assert_eq!(set.invert(350.0), 500.0);
    }

    #[test]
    fn test_mapping_cursor() {
        // Breaks: [100, 200], [300, 400]
        let set = set_with(&[(100.0, 200.0, 0.0), (300.0, 400.0, 0.0)]);
        let index = set.index();
        let mut cursor = index.cursor();

        assert_eq!(cursor.map_value(50.0), 50.0);
        assert_eq!(cursor.map_value(100.0), 100.0);
        assert_eq!(cursor.map_value(150.0), 100.0); // Inside first break
        assert_eq!(cursor.map_value(200.0), 100.0); // End of first break
        assert_eq!(cursor.map_value(250.0), 150.0);
        assert_eq!(cursor.map_value(350.0), 200.0); // Inside second break
        assert_eq!(cursor.map_value(450.0), 250.0);

        cursor.reset();
        assert_eq!(cursor.invert(50.0), 50.0);
        assert_eq!(cursor.invert(100.0), 200.0);
        assert_eq!(cursor.invert(150.0), 250.0);
        assert_eq!(cursor.invert(250.0), 450.0);
    }

    #[test]
    fn test_split_range() {
        let set = set_with(&[(100.0, 200.0, 0.0), (300.0, 400.0, 0.5)]);
        assert_eq!(
            set.split_range(0.0, 500.0),
            vec![(0.0, 100.0), (200.0, 300.0), (400.0, 500.0)]
        );
        assert_eq!(set.split_range(150.0, 250.0), vec![(200.0, 250.0)]);
        assert!(set.is_inside(100.0));
        assert!(!set.is_inside(200.0));
        assert!(set.index().is_hidden(150.0));
        assert!(!set.index().is_hidden(350.0));
    }

    #[test]
    fn test_index_rebuilt_lazily() {
        let set = set_with(&[(0.0, 1.0, 0.0), (2.0, 3.0, 0.0), (4.0, 5.0, 0.0)]);
        assert!(set.is_index_stale());

        let first = set.index();
        assert!(!set.is_index_stale());
        assert!(Arc::ptr_eq(&first, &set.index()));
    }

    #[test]
    fn test_update_keeps_order() {
        let mut set = set_with(&[(0.0, 10.0, 0.0), (20.0, 30.0, 0.0)]);
        let first = set.iter().next().unwrap().id();

        set.update(first, &mut NoopSink, |b, sink| b.set_range(40.0, 50.0, sink))
            .unwrap();

        let starts: Vec<f64> = set.iter().map(|b| b.start_value()).collect();
        assert_eq!(starts, vec![20.0, 40.0]);
        assert_eq!(set.map_value(60.0), 40.0);
    }

    #[test]
    fn test_attached_break_cannot_join_another_set() {
        let mut left = set_with(&[(0.0, 10.0, 0.0)]);
        let mut right = BreakSet::new(AxisId(1));
        let id = left.iter().next().unwrap().id();

        let copy = left.get(id).unwrap().duplicate();
        let err = right.add(copy, &mut NoopSink).unwrap_err();
        assert_eq!(err, BreakError::AlreadyAttached { id, axis: AxisId(0) });
        assert!(right.is_empty());

        let moved = left.remove(id, &mut NoopSink).unwrap();
        right.add(moved, &mut NoopSink).unwrap();
        assert!(!left.contains(id));
        assert!(right.contains(id));
    }

    #[test]
    fn test_update_rejects_replacement() {
        let mut set = set_with(&[(0.0, 10.0, 0.0)]);
        let id = set.iter().next().unwrap().id();

        let err = set
            .update(id, &mut NoopSink, |b, _| {
                *b = NumericBreak::new(0.0, 5.0)?.into();
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, BreakError::InvalidRange(_)));
        assert_eq!(set.get(id).map(|b| b.end_value()), Some(10.0));
    }
}
