use serde::{Deserialize, Serialize};

const MINUTE: f64 = 60.0;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;
const MONTH: f64 = 30.0 * DAY;
const YEAR: f64 = 365.0 * DAY;

/// Calendar unit of a tick interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl IntervalUnit {
    /// Nominal length in seconds. Months and years use 30 and 365 days.
    pub fn nominal_seconds(self) -> f64 {
        match self {
            Self::Millisecond => 0.001,
            Self::Second => 1.0,
            Self::Minute => MINUTE,
            Self::Hour => HOUR,
            Self::Day => DAY,
            Self::Week => 7.0 * DAY,
            Self::Month => MONTH,
            Self::Year => YEAR,
        }
    }

    /// `chrono` format string for tick labels at this granularity.
    pub fn label_format(self) -> &'static str {
        match self {
            Self::Year => "%Y",
            Self::Month => "%b %Y",
            Self::Week | Self::Day => "%d %b",
            Self::Hour | Self::Minute => "%H:%M",
            Self::Second => "%H:%M:%S",
            Self::Millisecond => "%H:%M:%S%.3f",
        }
    }
}

/// Tick interval, e.g. "every 2 days".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridInterval {
    pub unit: IntervalUnit,
    pub count: u32,
}

impl GridInterval {
    pub fn new(unit: IntervalUnit, count: u32) -> Self {
        Self { unit, count }
    }

    pub fn nominal_seconds(&self) -> f64 {
        self.unit.nominal_seconds() * f64::from(self.count)
    }

    /// Coarsest label granularity that still tells ticks apart over a visible span.
    pub fn for_span(span_sec: f64) -> Self {
        let unit = if span_sec > YEAR * 2.0 {
            IntervalUnit::Year
        } else if span_sec > MONTH * 2.0 {
            IntervalUnit::Month
        } else if span_sec > DAY * 1.5 {
            IntervalUnit::Day
        } else if span_sec > MINUTE * 5.0 {
            IntervalUnit::Minute
        } else if span_sec > 2.0 {
            IntervalUnit::Second
        } else {
            IntervalUnit::Millisecond
        };
        Self::new(unit, 1)
    }
}
