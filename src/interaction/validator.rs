//! Interval checks shared by drag-create, move and resize.

use thiserror::Error;

use super::time_grid::TimeGrid;
use crate::models::event::ScheduleEvent;

/// Half-open `[start, end)` span in minutes since local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
}

impl Interval {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn of_event(event: &ScheduleEvent) -> Self {
        Self::new(event.start_minutes(), event.end_minutes())
    }

    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    pub fn contains(&self, minute: i64) -> bool {
        self.start <= minute && minute < self.end
    }

    pub fn is_aligned_to(&self, resolution: i64) -> bool {
        resolution > 0 && self.start % resolution == 0 && self.end % resolution == 0
    }
}

/// Back-to-back intervals do not conflict.
pub fn overlaps(a: &Interval, b: &Interval) -> bool {
    a.start < b.end && b.start < a.end
}

/// Which minimum duration applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Create,
    Resize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("interval {start}..{end} is below the {minimum} minute minimum")]
    TooShort { start: i64, end: i64, minimum: i64 },
    #[error("interval starts at or after its end")]
    Inverted,
    #[error("interval leaves the displayed hours")]
    OutsideGrid,
}

pub struct IntervalValidator<'a> {
    grid: &'a TimeGrid,
}

impl<'a> IntervalValidator<'a> {
    pub fn new(grid: &'a TimeGrid) -> Self {
        Self { grid }
    }

    pub fn min_duration(&self, kind: EditKind) -> i64 {
        let config = self.grid.config();
        match kind {
            EditKind::Create => config.min_create_minutes,
            EditKind::Resize => config.min_resize_minutes,
        }
    }

    /// Clips both ends into the display window, rejecting what no longer fits.
    pub fn clamp_to_grid(&self, interval: Interval, kind: EditKind) -> Result<Interval, Rejection> {
        if interval.start >= interval.end {
            return Err(Rejection::Inverted);
        }

        let clamped = Interval::new(
            self.grid.clamp_minutes(interval.start),
            self.grid.clamp_minutes(interval.end),
        );

        let minimum = self.min_duration(kind);
        if clamped.duration() < minimum {
            return Err(Rejection::TooShort {
                start: clamped.start,
                end: clamped.end,
                minimum,
            });
        }

        Ok(clamped)
    }

    /// Strict containment check, no clipping.
    pub fn within_grid(&self, interval: Interval) -> Result<Interval, Rejection> {
        if interval.start >= interval.end {
            return Err(Rejection::Inverted);
        }
        if interval.start < self.grid.start_minutes() || interval.end > self.grid.end_minutes() {
            return Err(Rejection::OutsideGrid);
        }
        Ok(interval)
    }

    /// Ids of `events` that overlap `candidate`, skipping `exclude`.
    pub fn conflicts<'e>(
        &self,
        candidate: Interval,
        events: impl IntoIterator<Item = &'e ScheduleEvent>,
        exclude: Option<i64>,
    ) -> Vec<i64> {
        events
            .into_iter()
            .filter(|event| event.id.is_some() && event.id != exclude)
            .filter(|event| overlaps(&candidate, &Interval::of_event(event)))
            .filter_map(|event| event.id)
            .collect()
    }

    /// Whether a create affordance may be offered at `minute` in a column.
    pub fn can_offer_create<'e>(
        &self,
        minute: i64,
        column_events: impl IntoIterator<Item = &'e ScheduleEvent>,
    ) -> bool {
        if !self.grid.contains_minute(minute) || minute >= self.grid.end_minutes() {
            return false;
        }
        !column_events
            .into_iter()
            .any(|event| Interval::of_event(event).contains(minute))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use pretty_assertions::assert_eq;

    fn event_at(id: i64, start: (u32, u32), end: (u32, u32)) -> ScheduleEvent {
        let mut event = ScheduleEvent::appointment(
            1,
            Local.with_ymd_and_hms(2025, 3, 10, start.0, start.1, 0).unwrap(),
            Local.with_ymd_and_hms(2025, 3, 10, end.0, end.1, 0).unwrap(),
        )
        .unwrap();
        event.id = Some(id);
        event
    }

    #[test]
    fn test_back_to_back_does_not_overlap() {
        let a = Interval::new(540, 600);
        let b = Interval::new(600, 660);
        assert!(!overlaps(&a, &b));
        assert!(!overlaps(&b, &a));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let a = Interval::new(540, 610);
        let b = Interval::new(600, 660);
        assert!(overlaps(&a, &b));
        assert!(overlaps(&b, &a));

        let inner = Interval::new(550, 560);
        assert!(overlaps(&a, &inner));
        assert!(overlaps(&inner, &a));
    }

    #[test]
    fn test_clamp_to_grid_clips() {
        let grid = TimeGrid::default();
        let validator = IntervalValidator::new(&grid);

        let clamped = validator
            .clamp_to_grid(Interval::new(450, 540), EditKind::Create)
            .unwrap();
        assert_eq!(clamped, Interval::new(480, 540));
    }

    #[test]
    fn test_clamp_to_grid_rejects_short_result() {
        let grid = TimeGrid::default();
        let validator = IntervalValidator::new(&grid);

        // Only 20 minutes remain inside the grid
        let result = validator.clamp_to_grid(Interval::new(1300, 1400), EditKind::Create);
        assert_eq!(
            result,
            Err(Rejection::TooShort {
                start: 1300,
                end: 1320,
                minimum: 30
            })
        );

        // ...which is fine for a resize
        assert!(validator
            .clamp_to_grid(Interval::new(1300, 1400), EditKind::Resize)
            .is_ok());
    }

    #[test]
    fn test_clamp_rejects_inverted() {
        let grid = TimeGrid::default();
        let validator = IntervalValidator::new(&grid);
        assert_eq!(
            validator.clamp_to_grid(Interval::new(600, 600), EditKind::Resize),
            Err(Rejection::Inverted)
        );
    }

    #[test]
    fn test_within_grid() {
        let grid = TimeGrid::default();
        let validator = IntervalValidator::new(&grid);
        assert!(validator.within_grid(Interval::new(480, 1320)).is_ok());
        assert_eq!(
            validator.within_grid(Interval::new(470, 500)),
            Err(Rejection::OutsideGrid)
        );
    }

    #[test]
    fn test_conflicts_excludes_self_and_adjacent() {
        let grid = TimeGrid::default();
        let validator = IntervalValidator::new(&grid);
        let events = vec![
            event_at(1, (9, 0), (10, 0)),
            event_at(2, (10, 0), (11, 0)),
            event_at(3, (9, 30), (10, 30)),
        ];

        let ids = validator.conflicts(Interval::new(540, 600), &events, Some(1));
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_can_offer_create() {
        let grid = TimeGrid::default();
        let validator = IntervalValidator::new(&grid);
        let events = vec![event_at(1, (9, 0), (10, 0))];

        assert!(!validator.can_offer_create(540, &events));
        assert!(!validator.can_offer_create(590, &events));
        assert!(validator.can_offer_create(600, &events));
        assert!(!validator.can_offer_create(420, &events));
        assert!(!validator.can_offer_create(1320, &events));
    }
}
