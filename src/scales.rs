use std::sync::Arc;

use chrono::DateTime;
use d3rs::scale::{LinearScale, Scale as D3Scale};

use crate::break_set::BreakIndex;
use crate::breaks::TimeConverter;
use crate::data_types::{AxisFormat, GridInterval};

/// Linear scale from an axis domain to a pixel range, optionally compressed by breaks.
///
/// With breaks, the underlying linear scale spans the compressed domain and values go
/// through the break index on the way in and out, so the visible domain still spans the
/// full pixel range.
#[derive(Clone)]
pub struct ChartScale {
    domain: (f64, f64),
    range: (f32, f32),
    linear: LinearScale,
    breaks: Option<Arc<BreakIndex>>,
}

impl ChartScale {
    pub fn new_linear(domain: (f64, f64), range: (f32, f32)) -> Self {
        let domain = padded(domain.0, domain.1);
        Self {
            domain,
            range,
            linear: linear(domain, range),
            breaks: None,
        }
    }

    pub fn with_breaks(mut self, breaks: Option<Arc<BreakIndex>>) -> Self {
        self.breaks = breaks;
        let compressed = padded(self.compress(self.domain.0), self.compress(self.domain.1));
        self.linear = linear(compressed, self.range);
        self
    }

    fn compress(&self, value: f64) -> f64 {
        match &self.breaks {
            Some(index) => index.map_value(value),
            None => value,
        }
    }

    pub fn map(&self, value: f64) -> f32 {
        let res = self.linear.scale(self.compress(value)) as f32;
        if res.is_nan() || res.is_infinite() {
            0.0
        } else {
            res
        }
    }

    pub fn invert(&self, pixel: f32) -> f64 {
        let Some(compressed) = self.linear.invert(pixel as f64) else {
            return self.domain.0;
        };
        match &self.breaks {
            Some(index) => index.invert(compressed),
            None => compressed,
        }
    }

    pub fn format_tick(&self, value: f64, format: &AxisFormat) -> String {
        if let AxisFormat::Time(unit) = format {
            let span_sec = unit.to_seconds((self.domain.1 - self.domain.0).abs());
            if let Some(date) = unit.from_numeric(value) {
                return format_date(date, GridInterval::for_span(span_sec));
            }
        }

        if value.abs() < 0.001 && value.abs() > 0.0 {
            format!("{:.4}", value)
        } else if value.abs() > 1000.0 {
            format!("{:.0}", value)
        } else {
            format!("{:.2}", value)
        }
    }
}

fn linear(domain: (f64, f64), range: (f32, f32)) -> LinearScale {
    LinearScale::new()
        .domain(domain.0, domain.1)
        .range(range.0 as f64, range.1 as f64)
}

/// Round tick values covering `[min, max]`, at most about `count` of them.
///
/// A flat domain, or one too narrow for a normal tick step, yields its single value.
pub fn ticks(min: f64, max: f64, count: usize) -> Vec<f64> {
    if count == 0 || !min.is_finite() || !max.is_finite() {
        return Vec::new();
    }
    if !((max - min).abs() / count as f64).is_normal() {
        return vec![min];
    }
    LinearScale::new()
        .domain(min, max)
        .range(0.0, 1.0)
        .ticks(count)
}

/// Tick label for a date at the granularity of `interval`.
pub fn format_date(date: DateTime<chrono::Utc>, interval: GridInterval) -> String {
    date.format(interval.unit.label_format()).to_string()
}

fn padded(mut d_min: f64, mut d_max: f64) -> (f64, f64) {
    if (d_max - d_min).abs() < f64::EPSILON {
        d_min -= 0.5;
        d_max += 0.5;
    }
    (d_min, d_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::TimeUnit;

    #[test]
    fn test_degenerate_tick_domains() {
        assert_eq!(ticks(5.0, 5.0, 10), vec![5.0]);
        assert_eq!(ticks(0.0, 1e-310, 10), vec![0.0]);
        assert!(ticks(0.0, f64::NAN, 10).is_empty());
        assert!(ticks(0.0, 1.0, 0).is_empty());
        assert_eq!(ticks(0.0, 100.0, 5), vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);
    }

    #[test]
    fn test_time_tick_labels() {
        let scale = ChartScale::new_linear((0.0, 10.0 * 86_400_000.0), (0.0, 500.0));
        let label = scale.format_tick(
            1_768_176_000_000.0,
            &AxisFormat::Time(TimeUnit::Milliseconds),
        );
        assert_eq!(label, "12 Jan");

        assert_eq!(scale.format_tick(0.000123, &AxisFormat::Numeric), "0.0001");
        assert_eq!(scale.format_tick(123.456, &AxisFormat::Numeric), "123.46");
        assert_eq!(scale.format_tick(1234.56, &AxisFormat::Numeric), "1235");
    }
}
