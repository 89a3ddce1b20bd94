use serde::{Deserialize, Serialize};

use crate::break_set::BreakIndex;
use crate::scales;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    #[default]
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl TimeUnit {
    /// How many units make up one second.
    pub fn per_second(self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Milliseconds => 1_000.0,
            Self::Microseconds => 1_000_000.0,
            Self::Nanoseconds => 1_000_000_000.0,
        }
    }

    pub fn to_seconds(self, value: f64) -> f64 {
        value / self.per_second()
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub enum AxisFormat {
    #[default]
    Numeric,
    Time(TimeUnit),
}

/// Handle to an axis owned by a [`crate::chart::Chart`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct AxisId(pub usize);

/// Visible domain of an axis and its cached ticks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
    cached_ticks: Vec<f64>,
    last_tick_domain: (f64, f64),
    last_tick_count: usize,
}

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            ..Default::default()
        }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Ticks over the visible domain.
    ///
    /// With breaks, ticks are spaced evenly in compressed space and mapped back to raw
    /// values, so a collapsed weekend does not swallow a share of the labels. Ticks that
    /// would land on a hidden point are dropped.
    pub fn ticks(&mut self, count: usize, breaks: Option<&BreakIndex>) -> &[f64] {
        let (min, max) = (self.min, self.max);
        let tolerance = (max - min).abs() * 0.001;
        let domain_changed = (min - self.last_tick_domain.0).abs() > tolerance
            || (max - self.last_tick_domain.1).abs() > tolerance;

        if domain_changed || count != self.last_tick_count || self.cached_ticks.is_empty() {
            self.cached_ticks = match breaks.filter(|index| !index.is_empty()) {
                Some(index) => {
                    let l_min = index.map_value(min);
                    let l_max = index.map_value(max);
                    let mut cursor = index.cursor();
                    scales::ticks(l_min, l_max, count)
                        .into_iter()
                        .map(|t| cursor.invert(t))
                        .filter(|&t| !index.is_hidden(t))
                        .collect()
                }
                None => scales::ticks(min, max, count),
            };
            self.last_tick_domain = (min, max);
            self.last_tick_count = count;
        }
        &self.cached_ticks
    }

    pub fn update_ticks_if_needed(&mut self, count: usize, breaks: Option<&BreakIndex>) {
        let _ = self.ticks(count, breaks);
    }

    /// Drops cached ticks, e.g. after the breaks of the axis changed.
    pub fn invalidate_ticks(&mut self) {
        self.cached_ticks.clear();
    }

    pub fn cached_ticks(&self) -> &[f64] {
        &self.cached_ticks
    }

    pub fn set_domain(&mut self, min: f64, max: f64) {
        self.min = min;
        self.max = max;
        self.cached_ticks.clear();
    }
}
