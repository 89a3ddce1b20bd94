//! Calendar view over a numeric break.

use chrono::{DateTime, Utc};

use crate::breaks::{BreakId, NumericBreak};
use crate::data_types::{AxisId, GridInterval, TimeUnit};
use crate::error::BreakError;
use crate::invalidation::InvalidationSink;

/// Conversion between calendar dates and the numeric time values of an axis.
///
/// `from_numeric(to_numeric(d))` must return `d` for every date the axis can represent.
/// For [`TimeUnit`] a date is representable when it has no precision below the unit and its
/// numeric value stays within `f64`'s exact integer range, which excludes most nanosecond
/// values of present-day dates.
pub trait TimeConverter {
    fn to_numeric(&self, date: DateTime<Utc>) -> f64;
    fn from_numeric(&self, value: f64) -> Option<DateTime<Utc>>;
}

/// Numeric value of `date`, rejected when reading it back would yield another date.
fn exact_numeric(unit: TimeUnit, date: DateTime<Utc>) -> Result<f64, BreakError> {
    let value = unit.to_numeric(date);
    if unit.from_numeric(value) == Some(date) {
        Ok(value)
    } else {
        Err(BreakError::unrepresentable(date, unit))
    }
}

impl TimeConverter for TimeUnit {
    /// Truncates `date` to the unit's resolution.
    fn to_numeric(&self, date: DateTime<Utc>) -> f64 {
        match self {
            Self::Seconds => date.timestamp() as f64,
            Self::Milliseconds => date.timestamp_millis() as f64,
            Self::Microseconds => date.timestamp_micros() as f64,
            Self::Nanoseconds => date
                .timestamp_nanos_opt()
                .map(|n| n as f64)
                .unwrap_or_else(|| date.timestamp_micros() as f64 * 1_000.0),
        }
    }

    fn from_numeric(&self, value: f64) -> Option<DateTime<Utc>> {
        if !value.is_finite() {
            return None;
        }
        let per_second = self.per_second();
        let mut secs = (value / per_second).floor();
        let mut nanos = ((value - secs * per_second) * (1e9 / per_second)).round();
        if nanos >= 1e9 {
            secs += 1.0;
            nanos -= 1e9;
        }
        if secs < i64::MIN as f64 || secs > i64::MAX as f64 {
            return None;
        }
        DateTime::from_timestamp(secs as i64, nanos.max(0.0) as u32)
    }
}

/// A break whose bounds are expressed as calendar dates.
///
/// The dates are not stored: they are always converted from the numeric bounds, so the
/// two views cannot disagree. Dates finer than the time unit are rejected rather than
/// truncated.
#[derive(Debug, PartialEq)]
pub struct DateBreak {
    inner: NumericBreak,
    unit: TimeUnit,
    grid_interval: Option<GridInterval>,
    grid_date: Option<DateTime<Utc>>,
}

impl DateBreak {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        unit: TimeUnit,
    ) -> Result<Self, BreakError> {
        Self::with_size(start, end, 0.0, unit)
    }

    pub fn with_size(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        break_size: f64,
        unit: TimeUnit,
    ) -> Result<Self, BreakError> {
        let inner = NumericBreak::with_size(
            exact_numeric(unit, start)?,
            exact_numeric(unit, end)?,
            break_size,
        )?;
        Ok(Self {
            inner,
            unit,
            grid_interval: None,
            grid_date: None,
        })
    }

    pub fn id(&self) -> BreakId {
        self.inner.id()
    }

    pub fn axis(&self) -> Option<AxisId> {
        self.inner.axis()
    }

    pub fn time_unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn numeric(&self) -> &NumericBreak {
        &self.inner
    }

    pub(crate) fn numeric_mut(&mut self) -> &mut NumericBreak {
        &mut self.inner
    }

    pub(crate) fn duplicate(&self) -> Self {
        Self {
            inner: self.inner.duplicate(),
            ..*self
        }
    }

    /// `None` only when the numeric start was moved outside the calendar range.
    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.unit.from_numeric(self.inner.start_value())
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.unit.from_numeric(self.inner.end_value())
    }

    pub fn set_start_date(
        &mut self,
        date: DateTime<Utc>,
        sink: &mut dyn InvalidationSink,
    ) -> Result<(), BreakError> {
        let start = exact_numeric(self.unit, date)?;
        let end = self.inner.end_value();
        self.inner.set_range(start, end, sink)
    }

    pub fn set_end_date(
        &mut self,
        date: DateTime<Utc>,
        sink: &mut dyn InvalidationSink,
    ) -> Result<(), BreakError> {
        let start = self.inner.start_value();
        let end = exact_numeric(self.unit, date)?;
        self.inner.set_range(start, end, sink)
    }

    pub fn set_dates(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        sink: &mut dyn InvalidationSink,
    ) -> Result<(), BreakError> {
        let start = exact_numeric(self.unit, start)?;
        let end = exact_numeric(self.unit, end)?;
        self.inner.set_range(start, end, sink)
    }

    /// Tick interval last assigned by the tick generator.
    pub fn grid_interval(&self) -> Option<GridInterval> {
        self.grid_interval
    }

    pub fn set_grid_interval(&mut self, interval: GridInterval) {
        self.grid_interval = Some(interval);
    }

    /// Anchor date of the ticks drawn inside the break.
    pub fn grid_date(&self) -> Option<DateTime<Utc>> {
        self.grid_date
    }

    pub fn set_grid_date(&mut self, date: DateTime<Utc>) {
        self.grid_date = Some(date);
    }

    pub fn clear_grid(&mut self) {
        self.grid_interval = None;
        self.grid_date = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::IntervalUnit;
    use crate::invalidation::NoopSink;
    use chrono::TimeZone;

    fn date(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_time_unit_round_trip() {
        let d = Utc.timestamp_millis_opt(1_768_239_000_123).unwrap();
        for unit in [TimeUnit::Milliseconds, TimeUnit::Microseconds] {
            assert_eq!(unit.from_numeric(unit.to_numeric(d)), Some(d), "{unit:?}");
        }
        let whole = date(3);
        assert_eq!(
            TimeUnit::Seconds.from_numeric(TimeUnit::Seconds.to_numeric(whole)),
            Some(whole)
        );
    }

    #[test]
    fn test_pre_epoch_round_trip() {
        let d = Utc.with_ymd_and_hms(1969, 7, 20, 20, 17, 40).unwrap();
        let unit = TimeUnit::Milliseconds;
        assert_eq!(unit.from_numeric(unit.to_numeric(d)), Some(d));
    }

    #[test]
    fn test_non_finite_has_no_date() {
        assert_eq!(TimeUnit::Milliseconds.from_numeric(f64::NAN), None);
        assert_eq!(TimeUnit::Seconds.from_numeric(f64::INFINITY), None);
    }

    #[test]
    fn test_dates_follow_numeric_bounds() {
        let mut brk = DateBreak::new(date(3), date(5), TimeUnit::Milliseconds).unwrap();
        assert_eq!(brk.start_date(), Some(date(3)));

        brk.numeric_mut()
            .set_range(
                TimeUnit::Milliseconds.to_numeric(date(2)),
                TimeUnit::Milliseconds.to_numeric(date(6)),
                &mut NoopSink,
            )
            .unwrap();
        assert_eq!(brk.start_date(), Some(date(2)));
        assert_eq!(brk.end_date(), Some(date(6)));
    }

    #[test]
    fn test_start_after_end_is_rejected() {
        let mut brk = DateBreak::new(date(3), date(5), TimeUnit::Milliseconds).unwrap();
        assert!(brk.set_start_date(date(5), &mut NoopSink).is_err());
        assert!(brk.set_start_date(date(9), &mut NoopSink).is_err());
        assert!(brk.set_end_date(date(1), &mut NoopSink).is_err());
        assert_eq!(brk.start_date(), Some(date(3)));
        assert_eq!(brk.end_date(), Some(date(5)));
    }

    #[test]
    fn test_sub_unit_dates_are_rejected() {
        let fine = date(3) + chrono::Duration::microseconds(1_500);
        let err = DateBreak::new(fine, date(5), TimeUnit::Milliseconds).unwrap_err();
        assert!(matches!(err, BreakError::InvalidRange(_)));

        // The same date is exact at microsecond resolution.
        let brk = DateBreak::new(fine, date(5), TimeUnit::Microseconds).unwrap();
        assert_eq!(brk.start_date(), Some(fine));

        let mut brk = DateBreak::new(date(3), date(5), TimeUnit::Milliseconds).unwrap();
        assert!(brk.set_start_date(fine, &mut NoopSink).is_err());
        assert!(brk.set_end_date(date(4) + chrono::Duration::nanoseconds(1), &mut NoopSink).is_err());
        assert!(brk.set_dates(date(2), fine, &mut NoopSink).is_err());
        assert_eq!(brk.start_date(), Some(date(3)));
        assert_eq!(brk.end_date(), Some(date(5)));
    }

    #[test]
    fn test_grid_cache_survives_bound_changes() {
        let mut brk = DateBreak::new(date(3), date(5), TimeUnit::Milliseconds).unwrap();
        let interval = GridInterval::new(IntervalUnit::Hour, 6);
        brk.set_grid_interval(interval);
        brk.set_grid_date(date(3));

        brk.set_end_date(date(6), &mut NoopSink).unwrap();
        assert_eq!(brk.grid_interval(), Some(interval));
        assert_eq!(brk.grid_date(), Some(date(3)));

        brk.clear_grid();
        assert_eq!(brk.grid_interval(), None);
        assert_eq!(brk.grid_date(), None);
    }
}
