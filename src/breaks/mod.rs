//! Axis breaks: ranges of an axis scale drawn at a reduced width.

pub mod date;
pub mod numeric;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::data_types::AxisId;
use crate::error::BreakError;
use crate::invalidation::InvalidationSink;

pub use date::{DateBreak, TimeConverter};
pub use numeric::NumericBreak;

/// Identity of a break, stable for its whole life.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BreakId(pub u64);

impl BreakId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for BreakId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The closed set of break kinds an axis accepts.
#[derive(Debug, PartialEq)]
pub enum Break {
    Numeric(NumericBreak),
    Date(DateBreak),
}

impl Break {
    pub fn id(&self) -> BreakId {
        self.numeric().id()
    }

    pub fn start_value(&self) -> f64 {
        self.numeric().start_value()
    }

    pub fn end_value(&self) -> f64 {
        self.numeric().end_value()
    }

    pub fn break_size(&self) -> f64 {
        self.numeric().break_size()
    }

    /// Axis this break is attached to, if any.
    pub fn axis(&self) -> Option<AxisId> {
        self.numeric().axis()
    }

    pub fn numeric(&self) -> &NumericBreak {
        match self {
            Self::Numeric(b) => b,
            Self::Date(b) => b.numeric(),
        }
    }

    pub(crate) fn numeric_mut(&mut self) -> &mut NumericBreak {
        match self {
            Self::Numeric(b) => b,
            Self::Date(b) => b.numeric_mut(),
        }
    }

    pub(crate) fn duplicate(&self) -> Self {
        match self {
            Self::Numeric(b) => Self::Numeric(b.duplicate()),
            Self::Date(b) => Self::Date(b.duplicate()),
        }
    }

    pub fn as_date(&self) -> Option<&DateBreak> {
        match self {
            Self::Date(b) => Some(b),
            Self::Numeric(_) => None,
        }
    }

    pub fn as_date_mut(&mut self) -> Option<&mut DateBreak> {
        match self {
            Self::Date(b) => Some(b),
            Self::Numeric(_) => None,
        }
    }

    pub fn set_range(
        &mut self,
        start: f64,
        end: f64,
        sink: &mut dyn InvalidationSink,
    ) -> Result<(), BreakError> {
        self.numeric_mut().set_range(start, end, sink)
    }

    pub fn set_break_size(
        &mut self,
        size: f64,
        sink: &mut dyn InvalidationSink,
    ) -> Result<(), BreakError> {
        self.numeric_mut().set_break_size(size, sink)
    }

    pub fn map_value(&self, raw: f64) -> f64 {
        self.numeric().map_value(raw)
    }

    /// Whether `[start, end)` intersects this break.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        start < self.end_value() && self.start_value() < end
    }
}

impl From<NumericBreak> for Break {
    fn from(b: NumericBreak) -> Self {
        Self::Numeric(b)
    }
}

impl From<DateBreak> for Break {
    fn from(b: DateBreak) -> Self {
        Self::Date(b)
    }
}
