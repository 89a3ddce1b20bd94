use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::breaks::BreakId;
use crate::data_types::{AxisId, TimeUnit};

/// Errors raised when a break or a break set mutation is rejected.
///
/// Every failing operation leaves the break (or the set) exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BreakError {
    #[error("invalid break range: {0}")]
    InvalidRange(String),

    #[error("break {id} [{start}, {end}) overlaps break {other} [{other_start}, {other_end})")]
    Overlap {
        id: BreakId,
        start: f64,
        end: f64,
        other: BreakId,
        other_start: f64,
        other_end: f64,
    },

    #[error("break {0} is not attached to this break set")]
    NotFound(BreakId),

    #[error("break {id} is already attached to axis {axis:?}")]
    AlreadyAttached { id: BreakId, axis: AxisId },
}

impl BreakError {
    pub(crate) fn bounds(start: f64, end: f64) -> Self {
        Self::InvalidRange(format!("start {start} must be finite and lower than end {end}"))
    }

    pub(crate) fn unrepresentable(date: DateTime<Utc>, unit: TimeUnit) -> Self {
        Self::InvalidRange(format!("{date} is finer than the axis resolution {unit:?}"))
    }

    pub(crate) fn size(size: f64) -> Self {
        Self::InvalidRange(format!("break size {size} must lie within [0, 1]"))
    }
}
