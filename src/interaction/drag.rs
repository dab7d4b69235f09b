use chrono::{DateTime, Duration, Local, NaiveDate};
use egui::Pos2;
use thiserror::Error;

use super::time_grid::TimeGrid;
use super::validator::{Interval, IntervalValidator};
use crate::models::event::ScheduleEvent;
use crate::utils::date::{local_datetime, minutes_of_day};

/// Column cell under the pointer when a drag is released.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DropTarget {
    pub day: NaiveDate,
    pub hour: u32,
    pub resource_id: i64,
}

#[derive(Clone, Debug)]
pub struct DragContext {
    pub event_id: i64,
    pub version: i64,
    pub resource_id: i64,
    pub original_start: DateTime<Local>,
    pub original_end: DateTime<Local>,
    pub duration: Duration,
    /// Pointer position when the drag began
    pub origin: Pos2,
    pub pointer_pos: Option<Pos2>,
    pub hovered: Option<DropTarget>,
}

impl DragContext {
    pub fn from_event(event: &ScheduleEvent, origin: Pos2) -> Option<Self> {
        let event_id = event.id?;
        Some(Self {
            event_id,
            version: event.version,
            resource_id: event.resource_id,
            duration: event.end - event.start,
            original_start: event.start,
            original_end: event.end,
            origin,
            pointer_pos: None,
            hovered: None,
        })
    }

    pub fn vertical_delta(&self, pointer: Pos2) -> f32 {
        pointer.y - self.origin.y
    }
}

/// Accepted move, ready for a version-checked write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveCommit {
    pub event_id: i64,
    pub version: i64,
    pub resource_id: i64,
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MoveRejection {
    #[error("drop lands outside the displayed hours")]
    OutsideGrid,
    #[error("drop time does not exist in the local time zone")]
    InvalidLocalTime,
    #[error("event did not move")]
    Unchanged,
}

/// Resolves where a dragged event lands.
pub struct MoveEngine<'a> {
    grid: &'a TimeGrid,
}

impl<'a> MoveEngine<'a> {
    pub fn new(grid: &'a TimeGrid) -> Self {
        Self { grid }
    }

    /// Applies the total pointer displacement to the dragged event.
    ///
    /// The drop target only decides a change of day or resource; the time
    /// offset always comes from the vertical displacement.
    pub fn resolve(
        &self,
        drag: &DragContext,
        target: DropTarget,
        pointer: Pos2,
    ) -> Result<MoveCommit, MoveRejection> {
        let move_minutes = self.grid.delta_to_minutes(drag.vertical_delta(pointer));
        let shifted = drag.original_start + Duration::minutes(move_minutes);

        let same_column = target.resource_id == drag.resource_id
            && target.day == drag.original_start.date_naive();

        let (day, start_minutes) = if same_column {
            (shifted.date_naive(), minutes_of_day(shifted))
        } else {
            (target.day, minutes_of_day(shifted))
        };

        let start_minutes = self.grid.snap(start_minutes);
        let end_minutes = start_minutes + drag.duration.num_minutes();

        IntervalValidator::new(self.grid)
            .within_grid(Interval::new(start_minutes, end_minutes))
            .map_err(|_| MoveRejection::OutsideGrid)?;

        let start = local_datetime(day, start_minutes).ok_or(MoveRejection::InvalidLocalTime)?;
        let end = start + drag.duration;

        if start == drag.original_start && target.resource_id == drag.resource_id {
            return Err(MoveRejection::Unchanged);
        }

        Ok(MoveCommit {
            event_id: drag.event_id,
            version: drag.version,
            resource_id: target.resource_id,
            start,
            end,
        })
    }
}

/// Holds the single in-flight move for one grid.
#[derive(Debug, Default)]
pub struct DragManager {
    active: Option<DragContext>,
}

impl DragManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, context: DragContext) {
        self.active = Some(context);
    }

    pub fn active(&self) -> Option<&DragContext> {
        self.active.as_ref()
    }

    pub fn is_dragging_event(&self, event_id: i64) -> bool {
        self.active.as_ref().is_some_and(|c| c.event_id == event_id)
    }

    pub fn update_hover(&mut self, target: DropTarget, pointer_pos: Pos2) {
        if let Some(state) = self.active.as_mut() {
            state.hovered = Some(target);
            state.pointer_pos = Some(pointer_pos);
        }
    }

    /// Ends the drag and resolves the drop against the last hovered cell.
    pub fn finish(&mut self, grid: &TimeGrid) -> Option<Result<MoveCommit, MoveRejection>> {
        let context = self.active.take()?;
        let target = context.hovered?;
        let pointer = context.pointer_pos.unwrap_or(context.origin);
        let outcome = MoveEngine::new(grid).resolve(&context, target, pointer);
        if let Err(rejection) = &outcome {
            log::debug!("Discarding move of event {}: {}", context.event_id, rejection);
        }
        Some(outcome)
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn at(d: u32, hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, d, hour, minute, 0).unwrap()
    }

    fn stored(resource_id: i64, start: DateTime<Local>, end: DateTime<Local>) -> ScheduleEvent {
        let mut event = ScheduleEvent::appointment(resource_id, start, end).unwrap();
        event.id = Some(7);
        event.version = 3;
        event
    }

    fn origin() -> Pos2 {
        Pos2::new(100.0, 200.0)
    }

    #[test]
    fn test_same_column_move_applies_delta() {
        let grid = TimeGrid::default();
        let event = stored(1, at(10, 9, 0), at(10, 9, 30));
        let drag = DragContext::from_event(&event, origin()).unwrap();

        let target = DropTarget {
            day: day(10),
            hour: 10,
            resource_id: 1,
        };
        let commit = MoveEngine::new(&grid)
            .resolve(&drag, target, Pos2::new(100.0, 263.0))
            .unwrap();

        assert_eq!(commit.start, at(10, 10, 0));
        assert_eq!(commit.end, at(10, 10, 30));
        assert_eq!(commit.version, 3);
    }

    #[test]
    fn test_cross_column_move_preserves_time_of_day() {
        let grid = TimeGrid::default();
        let event = stored(1, at(10, 9, 0), at(10, 9, 30));
        let drag = DragContext::from_event(&event, origin()).unwrap();

        let target = DropTarget {
            day: day(11),
            hour: 9,
            resource_id: 2,
        };
        let commit = MoveEngine::new(&grid)
            .resolve(&drag, target, Pos2::new(300.0, 200.0))
            .unwrap();

        assert_eq!(commit.resource_id, 2);
        assert_eq!(commit.start, at(11, 9, 0));
        assert_eq!(commit.end, at(11, 9, 30));
    }

    #[test]
    fn test_cross_day_move_uses_pointer_delta_not_hour() {
        let grid = TimeGrid::default();
        let event = stored(1, at(10, 9, 0), at(10, 9, 30));
        let drag = DragContext::from_event(&event, origin()).unwrap();

        // Hovered hour says 14:00 but the pointer only moved 40 minutes
        let target = DropTarget {
            day: day(12),
            hour: 14,
            resource_id: 1,
        };
        let commit = MoveEngine::new(&grid)
            .resolve(&drag, target, Pos2::new(100.0, 240.0))
            .unwrap();

        assert_eq!(commit.start, at(12, 9, 40));
        assert_eq!(commit.end, at(12, 10, 10));
    }

    #[test]
    fn test_move_past_grid_end_is_rejected() {
        let grid = TimeGrid::default();
        let event = stored(1, at(10, 21, 0), at(10, 21, 40));
        let drag = DragContext::from_event(&event, origin()).unwrap();

        let target = DropTarget {
            day: day(10),
            hour: 21,
            resource_id: 1,
        };
        let result = MoveEngine::new(&grid).resolve(&drag, target, Pos2::new(100.0, 230.0));
        assert_eq!(result, Err(MoveRejection::OutsideGrid));
    }

    #[test]
    fn test_move_before_grid_start_is_rejected() {
        let grid = TimeGrid::default();
        let event = stored(1, at(10, 8, 10), at(10, 8, 40));
        let drag = DragContext::from_event(&event, origin()).unwrap();

        let target = DropTarget {
            day: day(10),
            hour: 8,
            resource_id: 1,
        };
        let result = MoveEngine::new(&grid).resolve(&drag, target, Pos2::new(100.0, 180.0));
        assert_eq!(result, Err(MoveRejection::OutsideGrid));
    }

    #[test]
    fn test_jitter_below_half_snap_is_unchanged() {
        let grid = TimeGrid::default();
        let event = stored(1, at(10, 9, 0), at(10, 9, 30));
        let drag = DragContext::from_event(&event, origin()).unwrap();

        let target = DropTarget {
            day: day(10),
            hour: 9,
            resource_id: 1,
        };
        let result = MoveEngine::new(&grid).resolve(&drag, target, Pos2::new(102.0, 203.0));
        assert_eq!(result, Err(MoveRejection::Unchanged));
    }

    #[test]
    fn test_unsaved_event_cannot_be_dragged() {
        let event = ScheduleEvent::appointment(1, at(10, 9, 0), at(10, 9, 30)).unwrap();
        assert!(DragContext::from_event(&event, origin()).is_none());
    }

    #[test]
    fn test_manager_finish_without_hover_discards() {
        let grid = TimeGrid::default();
        let event = stored(1, at(10, 9, 0), at(10, 9, 30));
        let mut manager = DragManager::new();
        manager.begin(DragContext::from_event(&event, origin()).unwrap());
        assert!(manager.is_dragging_event(7));

        assert!(manager.finish(&grid).is_none());
        assert!(manager.active().is_none());
    }

    #[test]
    fn test_manager_finish_resolves_last_hover() {
        let grid = TimeGrid::default();
        let event = stored(1, at(10, 9, 0), at(10, 9, 30));
        let mut manager = DragManager::new();
        manager.begin(DragContext::from_event(&event, origin()).unwrap());

        let target = DropTarget {
            day: day(10),
            hour: 9,
            resource_id: 1,
        };
        manager.update_hover(target, Pos2::new(100.0, 220.0));

        let commit = manager.finish(&grid).unwrap().unwrap();
        assert_eq!(commit.start, at(10, 9, 20));
        assert_eq!(commit.end, at(10, 9, 50));
    }
}
