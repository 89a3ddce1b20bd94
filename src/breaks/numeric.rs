use crate::breaks::BreakId;
use crate::data_types::AxisId;
use crate::error::BreakError;
use crate::invalidation::{Invalidation, InvalidationSink};

/// A break over a range of the axis's native numeric domain.
///
/// The range `[start, end)` is drawn at `break_size` times its natural width:
/// 0 collapses it to a single point, 1 leaves the scale untouched.
///
/// Not `Clone`: the id is the break's identity, and a break lives in at most one set.
#[derive(Debug, PartialEq)]
pub struct NumericBreak {
    id: BreakId,
    start: f64,
    end: f64,
    break_size: f64,
    axis: Option<AxisId>,
}

impl NumericBreak {
    /// Creates a fully collapsing break.
    pub fn new(start: f64, end: f64) -> Result<Self, BreakError> {
        Self::with_size(start, end, 0.0)
    }

    pub fn with_size(start: f64, end: f64, break_size: f64) -> Result<Self, BreakError> {
        validate_range(start, end)?;
        validate_size(break_size)?;
        Ok(Self {
            id: BreakId::next(),
            start,
            end,
            break_size,
            axis: None,
        })
    }

    pub fn id(&self) -> BreakId {
        self.id
    }

    pub fn start_value(&self) -> f64 {
        self.start
    }

    pub fn end_value(&self) -> f64 {
        self.end
    }

    pub fn break_size(&self) -> f64 {
        self.break_size
    }

    pub fn axis(&self) -> Option<AxisId> {
        self.axis
    }

    /// Natural width of the excised range.
    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    /// Amount by which values past the break are shifted towards the origin.
    pub fn collapse(&self) -> f64 {
        self.width() * (1.0 - self.break_size)
    }

    pub fn contains(&self, raw: f64) -> bool {
        self.start <= raw && raw < self.end
    }

    /// Moves both bounds at once.
    ///
    /// A range equal to the current one is a no-op and raises no invalidation.
    pub fn set_range(
        &mut self,
        start: f64,
        end: f64,
        sink: &mut dyn InvalidationSink,
    ) -> Result<(), BreakError> {
        validate_range(start, end)?;
        if start == self.start && end == self.end {
            return Ok(());
        }
        self.start = start;
        self.end = end;
        // Moving a boundary changes both the mapping and which points sit inside the break.
        self.invalidate(Invalidation::ALL, sink);
        Ok(())
    }

    pub fn set_break_size(
        &mut self,
        size: f64,
        sink: &mut dyn InvalidationSink,
    ) -> Result<(), BreakError> {
        validate_size(size)?;
        if size == self.break_size {
            return Ok(());
        }
        self.break_size = size;
        self.invalidate(Invalidation::LAYOUT, sink);
        Ok(())
    }

    /// Translates a raw scale value through this single break.
    pub fn map_value(&self, raw: f64) -> f64 {
        if raw < self.start {
            raw
        } else if raw >= self.end {
            raw - self.collapse()
        } else {
            self.start + (raw - self.start) * self.break_size
        }
    }

    /// Inverse of [`Self::map_value`].
    ///
    /// The collapsed point of a zero-size break maps back to the break's end.
    pub fn invert(&self, compressed: f64) -> f64 {
        let compressed_end = self.start + self.width() * self.break_size;
        if compressed < self.start {
            compressed
        } else if compressed >= compressed_end {
            compressed + self.collapse()
        } else {
            self.start + (compressed - self.start) / self.break_size
        }
    }

    /// Copy sharing the same identity, for draft edits inside a set.
    pub(crate) fn duplicate(&self) -> Self {
        Self { ..*self }
    }

    pub(crate) fn attach(&mut self, axis: AxisId) {
        self.axis = Some(axis);
    }

    pub(crate) fn detach(&mut self) {
        self.axis = None;
    }

    fn invalidate(&self, kind: Invalidation, sink: &mut dyn InvalidationSink) {
        if let Some(axis) = self.axis {
            kind.emit(axis, sink);
        }
    }
}

pub(crate) fn validate_range(start: f64, end: f64) -> Result<(), BreakError> {
    if start.is_finite() && end.is_finite() && start < end {
        Ok(())
    } else {
        Err(BreakError::bounds(start, end))
    }
}

pub(crate) fn validate_size(size: f64) -> Result<(), BreakError> {
    if (0.0..=1.0).contains(&size) {
        Ok(())
    } else {
        Err(BreakError::size(size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invalidation::{InvalidationChannel, NoopSink};

    #[test]
    fn test_piecewise_mapping() {
        let brk = NumericBreak::with_size(100.0, 200.0, 0.25).unwrap();

        assert_eq!(brk.map_value(50.0), 50.0);
        assert_eq!(brk.map_value(100.0), 100.0);
        assert_eq!(brk.map_value(140.0), 110.0);
        assert_eq!(brk.map_value(200.0), 125.0);
        assert_eq!(brk.map_value(300.0), 225.0);

        assert_eq!(brk.invert(110.0), 140.0);
        assert_eq!(brk.invert(225.0), 300.0);
    }

    #[test]
    fn test_collapsed_inverse_lands_on_end() {
        let brk = NumericBreak::new(10.0, 20.0).unwrap();
        assert_eq!(brk.map_value(15.0), 10.0);
        assert_eq!(brk.invert(10.0), 20.0);
        assert_eq!(brk.invert(9.0), 9.0);
    }

    #[test]
    fn test_rejected_range_keeps_bounds() {
        let mut brk = NumericBreak::new(0.0, 10.0).unwrap();
        let err = brk.set_range(10.0, 10.0, &mut NoopSink).unwrap_err();
        assert!(matches!(err, BreakError::InvalidRange(_)));
        assert!(brk.set_range(f64::NAN, 10.0, &mut NoopSink).is_err());
        assert_eq!((brk.start_value(), brk.end_value()), (0.0, 10.0));
    }

    #[test]
    fn test_rejected_size_keeps_size() {
        let mut brk = NumericBreak::with_size(0.0, 10.0, 0.5).unwrap();
        assert!(brk.set_break_size(1.5, &mut NoopSink).is_err());
        assert!(brk.set_break_size(-0.1, &mut NoopSink).is_err());
        assert!(brk.set_break_size(f64::NAN, &mut NoopSink).is_err());
        assert_eq!(brk.break_size(), 0.5);
    }

    #[test]
    fn test_detached_break_skips_invalidation() {
        let mut channel = InvalidationChannel::new();
        let mut brk = NumericBreak::new(0.0, 10.0).unwrap();
        brk.set_range(1.0, 5.0, &mut channel).unwrap();
        assert_eq!(brk.start_value(), 1.0);
        assert!(channel.is_clean());

        brk.attach(AxisId(7));
        brk.set_break_size(0.5, &mut channel).unwrap();
        assert_eq!(channel.pending(AxisId(7)), Invalidation::LAYOUT);
    }
}
