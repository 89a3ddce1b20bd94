//! chart_breaks crate: axis breaks for chart scales
//!
//! A break cuts a range out of a continuous axis (e.g. weekends on a time axis) and draws
//! it at a reduced width. Breaks are kept per axis in a [`BreakSet`], which maps raw values
//! to compressed positions. Boundary changes are reported through deferred invalidation
//! and consumed once per render cycle by [`Chart::validate`].

pub mod break_set;
pub mod breaks;
pub mod chart;
pub mod config;
pub mod data_types;
pub mod error;
pub mod invalidation;
pub mod scales;

pub use break_set::{BreakCursor, BreakIndex, BreakSegment, BreakSet};
pub use breaks::{Break, BreakId, DateBreak, NumericBreak, TimeConverter};
pub use chart::{Chart, ChartAxis, SeriesState, ValidationReport};
pub use config::{AxisBreaksConfig, BreakConfig, ChartBreaksConfig};
pub use data_types::{AxisFormat, AxisId, AxisRange, GridInterval, IntervalUnit, TimeUnit};
pub use error::BreakError;
pub use invalidation::{Invalidation, InvalidationChannel, InvalidationSink, NoopSink};
