//! Declarative break configuration.
//!
//! ```json
//! {
//!   "axes": [{
//!     "axis": 0,
//!     "time_unit": "Milliseconds",
//!     "breaks": [
//!       { "kind": "date", "start_date": "2026-01-03T00:00:00Z", "end_date": "2026-01-05T00:00:00Z" },
//!       { "kind": "numeric", "start": 10.0, "end": 20.0, "break_size": 0.5 }
//!     ]
//!   }]
//! }
//! ```

use chrono::{DateTime, Utc};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::break_set::BreakSet;
use crate::breaks::{Break, DateBreak, NumericBreak};
use crate::chart::Chart;
use crate::data_types::{AxisId, TimeUnit};
use crate::error::BreakError;
use crate::invalidation::NoopSink;

/// One break entry, discriminated by `kind`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BreakConfig {
    Numeric {
        start: f64,
        end: f64,
        #[serde(default)]
        break_size: f64,
    },
    Date {
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        #[serde(default)]
        break_size: f64,
    },
}

impl BreakConfig {
    pub fn build(&self, unit: TimeUnit) -> Result<Break, BreakError> {
        Ok(match *self {
            Self::Numeric {
                start,
                end,
                break_size,
            } => NumericBreak::with_size(start, end, break_size)?.into(),
            Self::Date {
                start_date,
                end_date,
                break_size,
            } => DateBreak::with_size(start_date, end_date, break_size, unit)?.into(),
        })
    }
}

/// The complete list of breaks of one axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisBreaksConfig {
    pub axis: AxisId,
    #[serde(default)]
    pub time_unit: TimeUnit,
    #[serde(default)]
    pub breaks: Vec<BreakConfig>,
}

impl AxisBreaksConfig {
    /// Builds every entry into a detached set, failing on the first invalid entry.
    fn build_set(&self) -> Result<BreakSet> {
        let mut set = BreakSet::new(self.axis);
        for (i, entry) in self.breaks.iter().enumerate() {
            let added = entry
                .build(self.time_unit)
                .and_then(|brk| set.add(brk, &mut NoopSink));
            if let Err(err) = added {
                warn!(axis = ?self.axis, entry = i, %err, "rejected break configuration entry");
                return Err(err)
                    .wrap_err_with(|| format!("break entry {} of axis {:?}", i, self.axis));
            }
        }
        Ok(set)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartBreaksConfig {
    pub axes: Vec<AxisBreaksConfig>,
}

impl ChartBreaksConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).wrap_err("invalid break configuration")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).wrap_err("failed to serialize break configuration")
    }
}

impl Chart {
    /// Replaces the breaks of every configured axis.
    ///
    /// The whole configuration is validated before anything is applied, so a rejected
    /// entry leaves every axis unchanged.
    pub fn apply_config(&mut self, config: &ChartBreaksConfig) -> Result<()> {
        let mut staged = Vec::with_capacity(config.axes.len());
        for axis_config in &config.axes {
            if self.axis(axis_config.axis).is_none() {
                eyre::bail!("break configuration targets unknown axis {:?}", axis_config.axis);
            }
            staged.push((axis_config.axis, axis_config.build_set()?));
        }
        for (axis, set) in staged {
            self.replace_breaks(axis, set)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_entries() {
        let json = r#"{
            "axes": [{
                "axis": 0,
                "breaks": [
                    { "kind": "date", "start_date": "2026-01-03T00:00:00Z", "end_date": "2026-01-05T00:00:00Z" },
                    { "kind": "numeric", "start": 10.0, "end": 20.0, "break_size": 0.5 }
                ]
            }]
        }"#;
        let config = ChartBreaksConfig::from_json(json).unwrap();
        let axis = &config.axes[0];
        assert_eq!(axis.time_unit, TimeUnit::Milliseconds);
        assert!(matches!(
            axis.breaks[0],
            BreakConfig::Date { break_size, .. } if break_size == 0.0
        ));
        assert_eq!(
            axis.breaks[1],
            BreakConfig::Numeric {
                start: 10.0,
                end: 20.0,
                break_size: 0.5
            }
        );
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let json = r#"{ "axes": [{ "axis": 0, "breaks": [{ "kind": "weekly", "start": 1.0 }] }] }"#;
        assert!(ChartBreaksConfig::from_json(json).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = ChartBreaksConfig {
            axes: vec![AxisBreaksConfig {
                axis: AxisId(1),
                time_unit: TimeUnit::Seconds,
                breaks: vec![BreakConfig::Numeric {
                    start: 1.0,
                    end: 2.0,
                    break_size: 0.25,
                }],
            }],
        };
        let json = config.to_json().unwrap();
        assert_eq!(ChartBreaksConfig::from_json(&json).unwrap(), config);
    }
}
