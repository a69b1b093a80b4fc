//! Projection of plan phases onto a visible date window, and the month axis
//! drawn above them.

use anyhow::{bail, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::dates::{self, add_months, clamp_interval, days_between, days_in_month, DateRange};
use crate::model::{Phase, RoadmapPlan};

/// Columns per month when nothing else is configured.
pub const DEFAULT_MONTH_WIDTH: u16 = 12;

/// The visible date range. `end` is strictly after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            bail!(
                "timeline window must end after it starts ({} .. {})",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            );
        }
        Ok(Self { start, end })
    }

    /// Window from midnight of `from` to midnight of `to`.
    pub fn from_dates(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        Self::new(dates::midnight(from), dates::midnight(to))
    }

    /// January 1 of `today`'s year through December 31 of the following year.
    pub fn default_for(today: NaiveDate) -> Self {
        let year = today.year();
        let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(today);
        let end = NaiveDate::from_ymd_opt(year + 1, 12, 31).unwrap_or(today);
        Self {
            start: dates::midnight(start),
            end: dates::midnight(end).max(dates::midnight(start) + chrono::Duration::days(1)),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn total_days(&self) -> f64 {
        days_between(self.start, self.end)
    }

    /// The same span moved by whole months, keeping day-of-month where possible.
    ///
    /// Day clamping is lossy (Dec 31 + 2 months is Feb 28), so repeated
    /// shifts should start from a fixed window with a cumulative offset.
    /// `None` when the result leaves the representable calendar or collapses.
    pub fn shift_months(&self, months: i32) -> Option<Self> {
        let shift = |dt: DateTime<Utc>| -> Option<DateTime<Utc>> {
            let first = add_months(dt.date_naive(), months)?;
            let day = dt.day().min(days_in_month(first));
            let date = first.with_day(day)?;
            Some(date.and_time(dt.time()).and_utc())
        };
        Self::new(shift(self.start)?, shift(self.end)?).ok()
    }
}

/// Visible-window configuration shared by the text and terminal timelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineConfig {
    pub window: Window,
    pub month_width: u16,
}

impl TimelineConfig {
    pub fn new(window: Window, month_width: u16) -> Self {
        Self {
            window,
            month_width: month_width.max(1),
        }
    }

    pub fn grid(&self) -> Vec<MonthCell> {
        build_month_grid(&self.window, self.month_width)
    }

    pub fn content_width(&self) -> u16 {
        content_width(&self.grid())
    }
}

/// Where a phase sits inside the window, as fractions of the window span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhasePosition {
    pub left: f64,
    pub width: f64,
}

impl PhasePosition {
    pub const HIDDEN: PhasePosition = PhasePosition {
        left: 0.0,
        width: 0.0,
    };

    pub fn is_visible(&self) -> bool {
        self.width > 0.0
    }

    /// Map onto `total` columns as `(first_column, column_count)`.
    /// Visible phases get at least one column.
    pub fn to_columns(&self, total: u16) -> Option<(u16, u16)> {
        if !self.is_visible() || total == 0 {
            return None;
        }
        let total_f = f64::from(total);
        let first = (self.left * total_f).floor().clamp(0.0, total_f - 1.0) as u16;
        let last = ((self.left + self.width) * total_f).round().clamp(0.0, total_f) as u16;
        Some((first, last.saturating_sub(first).max(1)))
    }
}

/// Fractional position of `[start, end]` within `window`.
///
/// Phases with no overlap (including reversed phases) come back as
/// [`PhasePosition::HIDDEN`].
pub fn phase_position(start: DateTime<Utc>, end: DateTime<Utc>, window: &Window) -> PhasePosition {
    let Some(clamped) = clamp_interval(start, end, window.start, window.end) else {
        return PhasePosition::HIDDEN;
    };
    let total = window.total_days();
    PhasePosition {
        left: days_between(window.start, clamped.start) / total,
        width: days_between(clamped.start, clamped.end) / total,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseBar {
    pub phase: Phase,
    pub range: DateRange,
    pub position: PhasePosition,
}

/// Project all five phases of `plan` onto `window`.
pub fn plan_bars(plan: &RoadmapPlan, window: &Window) -> Vec<PhaseBar> {
    plan.phases
        .ranges()
        .map(|(phase, range)| PhaseBar {
            phase,
            range,
            position: phase_position(range.start, range.end, window),
        })
        .collect()
}

/// Fractional position of `now`, if it falls inside the window.
pub fn today_marker(now: DateTime<Utc>, window: &Window) -> Option<f64> {
    if now < window.start || now > window.end {
        return None;
    }
    Some(days_between(window.start, now) / window.total_days())
}

/// Column holding `fraction` of the way across `total` columns.
pub fn fraction_to_column(fraction: f64, total: u16) -> Option<u16> {
    if total == 0 || !(0.0..=1.0).contains(&fraction) {
        return None;
    }
    Some((fraction * f64::from(total)).floor().min(f64::from(total - 1)) as u16)
}

/// One month column of the timeline axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCell {
    pub first_day: NaiveDate,
    pub label: String,
    pub days: u32,
    /// Offset of the column from the left edge of the content.
    pub offset: u32,
    pub width: u32,
}

/// One cell per calendar month from the month of `window.start` to the
/// month of `window.end`, both included.
pub fn build_month_grid(window: &Window, month_width: u16) -> Vec<MonthCell> {
    let first = dates::start_of_month(window.start.date_naive());
    let last = dates::start_of_month(window.end.date_naive());
    let width = u32::from(month_width);

    let mut cells = Vec::new();
    let mut month = first;
    while month <= last {
        cells.push(MonthCell {
            first_day: month,
            label: month.format("%b %Y").to_string(),
            days: days_in_month(month),
            offset: cells.len() as u32 * width,
            width,
        });
        let Some(next) = add_months(month, 1) else {
            break;
        };
        month = next;
    }
    cells
}

/// Total width of the scrollable content: months x month width.
pub fn content_width(grid: &[MonthCell]) -> u16 {
    grid.iter()
        .map(|c| c.width)
        .sum::<u32>()
        .min(u32::from(u16::MAX)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PhaseDates;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn window_2025() -> Window {
        Window::new(ymd(2025, 1, 1), ymd(2025, 12, 31)).unwrap()
    }

    #[test]
    fn degenerate_window_is_rejected() {
        assert!(Window::new(ymd(2025, 1, 1), ymd(2025, 1, 1)).is_err());
        assert!(Window::new(ymd(2025, 2, 1), ymd(2025, 1, 1)).is_err());
    }

    #[test]
    fn full_window_is_whole_width() {
        let w = window_2025();
        let pos = phase_position(w.start(), w.end(), &w);
        assert_eq!(pos, PhasePosition { left: 0.0, width: 1.0 });
    }

    #[test]
    fn outside_window_is_hidden() {
        let w = window_2025();
        let before = phase_position(ymd(2024, 1, 1), ymd(2024, 6, 1), &w);
        let after = phase_position(ymd(2026, 1, 1), ymd(2026, 6, 1), &w);
        assert!(!before.is_visible());
        assert!(!after.is_visible());
        assert_eq!(before.width, 0.0);
    }

    #[test]
    fn partial_overlap_is_clamped() {
        let w = Window::new(ymd(2025, 1, 1), ymd(2025, 1, 11)).unwrap();
        let pos = phase_position(ymd(2024, 12, 1), ymd(2025, 1, 6), &w);
        assert_eq!(pos.left, 0.0);
        assert!((pos.width - 0.5).abs() < 1e-9);

        let pos = phase_position(ymd(2025, 1, 6), ymd(2025, 3, 1), &w);
        assert!((pos.left - 0.5).abs() < 1e-9);
        assert!((pos.width - 0.5).abs() < 1e-9);
    }

    #[test]
    fn reversed_phase_is_hidden() {
        let w = window_2025();
        assert_eq!(
            phase_position(ymd(2025, 6, 1), ymd(2025, 3, 1), &w),
            PhasePosition::HIDDEN
        );
    }

    #[test]
    fn columns_cover_at_least_one_cell() {
        let pos = PhasePosition { left: 0.5, width: 0.001 };
        assert_eq!(pos.to_columns(100), Some((50, 1)));
        assert_eq!(PhasePosition::HIDDEN.to_columns(100), None);
        let full = PhasePosition { left: 0.0, width: 1.0 };
        assert_eq!(full.to_columns(24), Some((0, 24)));
    }

    #[test]
    fn plan_bars_cover_every_phase() {
        let w = window_2025();
        let dates = PhaseDates::sequential(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        let plan = RoadmapPlan {
            id: "p".into(),
            capability_id: "c".into(),
            version: 1,
            phases: dates,
            is_active: true,
            created_at: ymd(2025, 1, 1),
        };
        let bars = plan_bars(&plan, &w);
        assert_eq!(bars.len(), 5);
        assert_eq!(bars[0].phase, Phase::Requirements);
        assert!(bars.iter().all(|b| b.position.is_visible()));
        for pair in bars.windows(2) {
            let a = pair[0].position;
            let b = pair[1].position;
            assert!((a.left + a.width - b.left).abs() < 1e-9);
        }
    }

    #[test]
    fn today_marker_inside_only() {
        let w = Window::new(ymd(2025, 1, 1), ymd(2025, 1, 11)).unwrap();
        assert_eq!(today_marker(ymd(2025, 1, 6), &w), Some(0.5));
        assert_eq!(today_marker(ymd(2026, 1, 6), &w), None);
    }

    #[test]
    fn fraction_columns() {
        assert_eq!(fraction_to_column(0.0, 10), Some(0));
        assert_eq!(fraction_to_column(0.55, 10), Some(5));
        assert_eq!(fraction_to_column(1.0, 10), Some(9));
        assert_eq!(fraction_to_column(1.5, 10), None);
        assert_eq!(fraction_to_column(0.5, 0), None);
    }

    #[test]
    fn grid_spans_both_end_months() {
        let w = Window::new(ymd(2025, 1, 15), ymd(2025, 3, 2)).unwrap();
        let grid = build_month_grid(&w, 10);
        let labels: Vec<_> = grid.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Jan 2025", "Feb 2025", "Mar 2025"]);
        assert_eq!(grid[1].days, 28);
        assert_eq!(grid[2].offset, 20);
        assert_eq!(content_width(&grid), 30);
    }

    #[test]
    fn grid_crosses_year_boundary() {
        let w = Window::new(ymd(2024, 11, 1), ymd(2025, 2, 1)).unwrap();
        let grid = build_month_grid(&w, 5);
        assert_eq!(grid.len(), 4);
        assert_eq!(grid[0].first_day, NaiveDate::from_ymd_opt(2024, 11, 1).unwrap());
        assert_eq!(grid[3].first_day, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
    }

    #[test]
    fn grid_is_deterministic() {
        let w = window_2025();
        assert_eq!(build_month_grid(&w, 12), build_month_grid(&w, 12));
        assert_eq!(build_month_grid(&w, 12).len(), 12);
    }

    #[test]
    fn default_window_covers_two_years() {
        let w = Window::default_for(NaiveDate::from_ymd_opt(2025, 7, 4).unwrap());
        assert_eq!(w.start(), ymd(2025, 1, 1));
        assert_eq!(w.end(), ymd(2026, 12, 31));
        assert_eq!(build_month_grid(&w, 1).len(), 24);
    }

    #[test]
    fn shift_keeps_span_shape() {
        let w = window_2025().shift_months(1).unwrap();
        assert_eq!(w.start(), ymd(2025, 2, 1));
        assert_eq!(w.end(), ymd(2026, 1, 31));
        let back = w.shift_months(-1).unwrap();
        assert_eq!(back.start(), ymd(2025, 1, 1));
        assert_eq!(back.end(), ymd(2025, 12, 31));
    }

    #[test]
    fn shift_clamps_short_months() {
        let w = window_2025().shift_months(2).unwrap();
        assert_eq!(w.end(), ymd(2026, 2, 28));
    }

    #[test]
    fn shift_past_calendar_end_is_none() {
        let last = NaiveDate::MAX;
        let w = Window::from_dates(dates::start_of_month(last), last).unwrap();
        assert!(w.shift_months(1).is_none());
        assert!(w.shift_months(-1).is_some());
    }

    #[test]
    fn grid_stops_at_last_representable_month() {
        let last = NaiveDate::MAX;
        let from = dates::add_months(last, -2).unwrap();
        let w = Window::from_dates(from, last).unwrap();
        let grid = build_month_grid(&w, 1);
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[2].first_day, dates::start_of_month(last));
        assert_eq!(grid[2].days, 31);
    }
}
