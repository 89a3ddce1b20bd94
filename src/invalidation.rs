//! Deferred invalidation.
//!
//! Breaks never recompute anything on the axis side when their bounds move. They push
//! dirty marks through an [`InvalidationSink`], and the owner of the axes pulls and clears
//! those marks once per render cycle (see [`crate::chart::Chart::validate`]).
//!
//! Two independent kinds of dirtiness exist for an axis:
//! - **layout**: the coordinate mapping changed, tick positions and pixel coordinates must
//!   be recomputed before the next draw.
//! - **series**: the set of visible points, or their coordinates, may have changed; every
//!   series bound to the axis must re-evaluate which points fall inside a break.

use std::collections::BTreeMap;

use tracing::trace;

use crate::data_types::AxisId;

/// Receiver of invalidation marks for an axis.
///
/// Both operations are fire-and-forget and must be idempotent within one render cycle.
pub trait InvalidationSink {
    fn mark_layout_dirty(&mut self, axis: AxisId);
    fn mark_series_dirty(&mut self, axis: AxisId);
}

/// Sink for breaks that are not attached to anything yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl InvalidationSink for NoopSink {
    fn mark_layout_dirty(&mut self, _axis: AxisId) {}
    fn mark_series_dirty(&mut self, _axis: AxisId) {}
}

/// Set of pending invalidation kinds for one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Invalidation {
    pub layout: bool,
    pub series: bool,
}

impl Invalidation {
    pub const NONE: Self = Self {
        layout: false,
        series: false,
    };
    pub const LAYOUT: Self = Self {
        layout: true,
        series: false,
    };
    pub const ALL: Self = Self {
        layout: true,
        series: true,
    };

    pub fn is_empty(&self) -> bool {
        !self.layout && !self.series
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            layout: self.layout || other.layout,
            series: self.series || other.series,
        }
    }

    /// Forwards these marks for `axis` to `sink`.
    pub fn emit(self, axis: AxisId, sink: &mut dyn InvalidationSink) {
        if self.layout {
            sink.mark_layout_dirty(axis);
        }
        if self.series {
            sink.mark_series_dirty(axis);
        }
    }
}

/// Marks recorded while a mutation is still a draft.
///
/// Forwarded to the real sink only once the mutation has been committed, so a rejected
/// mutation never leaks an invalidation.
#[derive(Debug, Default)]
pub struct PendingInvalidation {
    marks: BTreeMap<AxisId, Invalidation>,
}

impl PendingInvalidation {
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn flush(self, sink: &mut dyn InvalidationSink) {
        for (axis, marks) in self.marks {
            marks.emit(axis, sink);
        }
    }

    fn record(&mut self, axis: AxisId, kind: Invalidation) {
        let entry = self.marks.entry(axis).or_default();
        *entry = entry.union(kind);
    }
}

impl InvalidationSink for PendingInvalidation {
    fn mark_layout_dirty(&mut self, axis: AxisId) {
        self.record(axis, Invalidation::LAYOUT);
    }

    fn mark_series_dirty(&mut self, axis: AxisId) {
        self.record(
            axis,
            Invalidation {
                layout: false,
                series: true,
            },
        );
    }
}

/// Coalescing dirty flags for every axis of a chart.
///
/// A mark on an axis that is already dirty for the same kind is dropped, so a batch of
/// edits between two validation passes produces a single signal per kind and axis.
#[derive(Debug, Default)]
pub struct InvalidationChannel {
    pending: BTreeMap<AxisId, Invalidation>,
    layout_signals: u64,
    series_signals: u64,
}

impl InvalidationChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending marks for `axis` (empty when clean).
    pub fn pending(&self, axis: AxisId) -> Invalidation {
        self.pending.get(&axis).copied().unwrap_or_default()
    }

    pub fn is_clean(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of layout signals raised since creation, after coalescing.
    pub fn layout_signals(&self) -> u64 {
        self.layout_signals
    }

    /// Number of series signals raised since creation, after coalescing.
    pub fn series_signals(&self) -> u64 {
        self.series_signals
    }

    /// Takes every pending mark, leaving all axes clean.
    pub fn drain(&mut self) -> Vec<(AxisId, Invalidation)> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    /// Forgets pending marks for an axis that no longer exists.
    pub fn discard(&mut self, axis: AxisId) {
        self.pending.remove(&axis);
    }
}

impl InvalidationSink for InvalidationChannel {
    fn mark_layout_dirty(&mut self, axis: AxisId) {
        let entry = self.pending.entry(axis).or_default();
        if entry.layout {
            trace!(?axis, "layout already dirty, mark coalesced");
            return;
        }
        entry.layout = true;
        self.layout_signals += 1;
    }

    fn mark_series_dirty(&mut self, axis: AxisId) {
        let entry = self.pending.entry(axis).or_default();
        if entry.series {
            trace!(?axis, "series already dirty, mark coalesced");
            return;
        }
        entry.series = true;
        self.series_signals += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_coalesce_until_drained() {
        let mut channel = InvalidationChannel::new();
        let axis = AxisId(3);

        channel.mark_layout_dirty(axis);
        channel.mark_layout_dirty(axis);
        channel.mark_series_dirty(axis);
        channel.mark_series_dirty(axis);

        assert_eq!(channel.layout_signals(), 1);
        assert_eq!(channel.series_signals(), 1);
        assert_eq!(channel.pending(axis), Invalidation::ALL);

        let drained = channel.drain();
        assert_eq!(drained, vec![(axis, Invalidation::ALL)]);
        assert!(channel.is_clean());

        // A new cycle raises a new signal.
        channel.mark_layout_dirty(axis);
        assert_eq!(channel.layout_signals(), 2);
        assert_eq!(channel.pending(axis), Invalidation::LAYOUT);
    }

    #[test]
    fn test_pending_flushes_only_on_demand() {
        let mut pending = PendingInvalidation::default();
        pending.mark_layout_dirty(AxisId(0));
        pending.mark_series_dirty(AxisId(0));
        assert!(!pending.is_empty());

        let mut channel = InvalidationChannel::new();
        assert!(channel.is_clean());

        pending.flush(&mut channel);
        assert_eq!(channel.pending(AxisId(0)), Invalidation::ALL);
    }
}
