//! Chart Model
//!
//! This module defines the `Chart`, which owns the axes, the breaks of each axis and the
//! series bound to them. Every break mutation goes through the chart, and the chart's
//! [`InvalidationChannel`] is the sink the breaks push their dirty marks into.
//!
//! Nothing is recomputed at mutation time. The host rendering loop calls
//! [`Chart::validate`] once per cycle, which drains the dirty marks, refreshes the ticks
//! of layout-dirty axes and remaps the series bound to series-dirty axes.

use chrono::{DateTime, Utc};
use eyre::{eyre, Result};
use tracing::debug;

use crate::break_set::{BreakIndex, BreakSet};
use crate::breaks::{Break, BreakId};
use crate::data_types::{AxisFormat, AxisId, AxisRange, GridInterval};
use crate::error::BreakError;
use crate::invalidation::{Invalidation, InvalidationChannel, InvalidationSink};
use crate::scales::ChartScale;

const DEFAULT_TICK_COUNT: usize = 8;

#[derive(Debug)]
pub struct ChartAxis {
    pub id: AxisId,
    pub format: AxisFormat,
    pub range: AxisRange,
    pub tick_count: usize,
    breaks: BreakSet,
}

impl ChartAxis {
    fn new(id: AxisId, format: AxisFormat, range: AxisRange) -> Self {
        Self {
            id,
            format,
            range,
            tick_count: DEFAULT_TICK_COUNT,
            breaks: BreakSet::new(id),
        }
    }

    pub fn breaks(&self) -> &BreakSet {
        &self.breaks
    }

    /// Scale of the visible domain onto `pixels`, compressed by the axis breaks.
    pub fn scale(&self, pixels: (f32, f32)) -> ChartScale {
        let breaks = (!self.breaks.is_empty()).then(|| self.breaks.index());
        ChartScale::new_linear((self.range.min, self.range.max), pixels).with_breaks(breaks)
    }

    /// Refreshes the tick interval and anchor cached on each date break.
    fn assign_break_grids(&mut self) {
        if !matches!(self.format, AxisFormat::Time(_)) {
            return;
        }
        for brk in self.breaks.date_breaks_mut() {
            let span_sec = brk.time_unit().to_seconds(brk.numeric().width());
            brk.set_grid_interval(GridInterval::for_span(span_sec));
            if let Some(start) = brk.start_date() {
                brk.set_grid_date(start);
            }
        }
    }
}

/// X values of one series and their positions after break compression.
#[derive(Clone, Debug, Default)]
pub struct SeriesState {
    pub id: String,
    pub axis: AxisId,
    x_values: Vec<f64>,
    compressed: Vec<f64>,
    inside: Vec<bool>,
}

impl SeriesState {
    pub fn x_values(&self) -> &[f64] {
        &self.x_values
    }

    /// Compressed positions, empty until the first validation pass.
    pub fn compressed(&self) -> &[f64] {
        &self.compressed
    }

    /// Whether point `i` falls inside a break.
    pub fn is_inside(&self, i: usize) -> bool {
        self.inside.get(i).copied().unwrap_or(false)
    }

    pub fn inside_count(&self) -> usize {
        self.inside.iter().filter(|&&inside| inside).count()
    }

    fn remap(&mut self, index: &BreakIndex) {
        self.compressed.clear();
        if self.x_values.windows(2).all(|w| w[0] <= w[1]) {
            let mut cursor = index.cursor();
            self.compressed
                .extend(self.x_values.iter().map(|&x| cursor.map_value(x)));
        } else {
            self.compressed
                .extend(self.x_values.iter().map(|&x| index.map_value(x)));
        }
        self.inside = self.x_values.iter().map(|&x| index.is_inside(x)).collect();
    }
}

/// What a validation pass recomputed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationReport {
    pub layout: Vec<AxisId>,
    pub series: Vec<String>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.layout.is_empty() && self.series.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Chart {
    axes: Vec<ChartAxis>,
    series: Vec<SeriesState>,
    channel: InvalidationChannel,
    next_axis_id: usize,
}

impl Chart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_axis(&mut self, format: AxisFormat, range: AxisRange) -> AxisId {
        let id = AxisId(self.next_axis_id);
        self.next_axis_id += 1;
        self.axes.push(ChartAxis::new(id, format, range));
        self.channel.mark_layout_dirty(id);
        id
    }

    /// Drops an axis together with the series bound to it, handing back its breaks.
    pub fn remove_axis(&mut self, id: AxisId) -> Result<Vec<Break>> {
        let idx = self
            .axes
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| eyre!("unknown axis {:?}", id))?;
        let mut axis = self.axes.remove(idx);
        self.series.retain(|s| s.axis != id);
        let breaks = axis.breaks.clear(&mut self.channel);
        self.channel.discard(id);
        Ok(breaks)
    }

    pub fn axis(&self, id: AxisId) -> Option<&ChartAxis> {
        self.axes.iter().find(|a| a.id == id)
    }

    pub fn axes(&self) -> impl Iterator<Item = &ChartAxis> {
        self.axes.iter()
    }

    fn axis_mut(&mut self, id: AxisId) -> Result<&mut ChartAxis> {
        self.axes
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| eyre!("unknown axis {:?}", id))
    }

    pub fn set_axis_domain(&mut self, id: AxisId, min: f64, max: f64) -> Result<()> {
        self.axis_mut(id)?.range.set_domain(min, max);
        self.channel.mark_layout_dirty(id);
        Ok(())
    }

    pub fn add_series(
        &mut self,
        id: impl Into<String>,
        axis: AxisId,
        x_values: Vec<f64>,
    ) -> Result<()> {
        let id = id.into();
        if self.axis(axis).is_none() {
            return Err(eyre!("series {} bound to unknown axis {:?}", id, axis));
        }
        if self.series.iter().any(|s| s.id == id) {
            return Err(eyre!("series {} already exists", id));
        }
        self.series.push(SeriesState {
            id,
            axis,
            x_values,
            ..Default::default()
        });
        self.channel.mark_series_dirty(axis);
        Ok(())
    }

    pub fn series(&self, id: &str) -> Option<&SeriesState> {
        self.series.iter().find(|s| s.id == id)
    }

    pub fn add_break(&mut self, axis: AxisId, brk: impl Into<Break>) -> Result<BreakId> {
        let target = self
            .axes
            .iter_mut()
            .find(|a| a.id == axis)
            .ok_or_else(|| eyre!("unknown axis {:?}", axis))?;
        Ok(target.breaks.add(brk, &mut self.channel)?)
    }

    pub fn remove_break(&mut self, axis: AxisId, id: BreakId) -> Result<Break> {
        let target = self
            .axes
            .iter_mut()
            .find(|a| a.id == axis)
            .ok_or_else(|| eyre!("unknown axis {:?}", axis))?;
        Ok(target.breaks.remove(id, &mut self.channel)?)
    }

    /// Applies `edit` to one break; see [`BreakSet::update`].
    pub fn update_break<F>(&mut self, axis: AxisId, id: BreakId, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Break, &mut dyn InvalidationSink) -> Result<(), BreakError>,
    {
        let target = self
            .axes
            .iter_mut()
            .find(|a| a.id == axis)
            .ok_or_else(|| eyre!("unknown axis {:?}", axis))?;
        Ok(target.breaks.update(id, &mut self.channel, edit)?)
    }

    pub fn set_break_range(
        &mut self,
        axis: AxisId,
        id: BreakId,
        start: f64,
        end: f64,
    ) -> Result<()> {
        self.update_break(axis, id, |b, sink| b.set_range(start, end, sink))
    }

    pub fn set_break_size(&mut self, axis: AxisId, id: BreakId, size: f64) -> Result<()> {
        self.update_break(axis, id, |b, sink| b.set_break_size(size, sink))
    }

    pub fn set_break_start_date(
        &mut self,
        axis: AxisId,
        id: BreakId,
        date: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_date_break(axis, id)?;
        self.update_break(axis, id, |b, sink| match b.as_date_mut() {
            Some(d) => d.set_start_date(date, sink),
            None => Ok(()),
        })
    }

    pub fn set_break_end_date(
        &mut self,
        axis: AxisId,
        id: BreakId,
        date: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_date_break(axis, id)?;
        self.update_break(axis, id, |b, sink| match b.as_date_mut() {
            Some(d) => d.set_end_date(date, sink),
            None => Ok(()),
        })
    }

    fn ensure_date_break(&self, axis: AxisId, id: BreakId) -> Result<()> {
        let brk = self
            .axis(axis)
            .ok_or_else(|| eyre!("unknown axis {:?}", axis))?
            .breaks
            .get(id)
            .ok_or(BreakError::NotFound(id))?;
        if brk.as_date().is_none() {
            return Err(eyre!("break {} is not a date break", id));
        }
        Ok(())
    }

    /// Replaces every break of `axis` at once. Used by the declarative configuration.
    pub(crate) fn replace_breaks(&mut self, axis: AxisId, breaks: BreakSet) -> Result<()> {
        let target = self
            .axes
            .iter_mut()
            .find(|a| a.id == axis)
            .ok_or_else(|| eyre!("unknown axis {:?}", axis))?;
        target.breaks = breaks;
        Invalidation::ALL.emit(axis, &mut self.channel);
        Ok(())
    }

    /// Compressed position of `raw` on `axis`.
    pub fn map_value(&self, axis: AxisId, raw: f64) -> Option<f64> {
        self.axis(axis).map(|a| a.breaks.map_value(raw))
    }

    pub fn invalidation(&self) -> &InvalidationChannel {
        &self.channel
    }

    /// Consumes the pending dirty marks. Marks raised after this call wait for the next pass.
    pub fn validate(&mut self) -> ValidationReport {
        let mut report = ValidationReport::default();

        for (axis_id, marks) in self.channel.drain() {
            let Some(axis) = self.axes.iter_mut().find(|a| a.id == axis_id) else {
                continue;
            };
            let index = axis.breaks.index();

            if marks.layout {
                axis.range.invalidate_ticks();
                axis.range
                    .update_ticks_if_needed(axis.tick_count, Some(index.as_ref()));
                axis.assign_break_grids();
                report.layout.push(axis_id);
            }
            if marks.series {
                for series in self.series.iter_mut().filter(|s| s.axis == axis_id) {
                    series.remap(&index);
                    report.series.push(series.id.clone());
                }
            }
        }

        if !report.is_empty() {
            debug!(
                layout = report.layout.len(),
                series = report.series.len(),
                "validation pass"
            );
        }
        report
    }
}
