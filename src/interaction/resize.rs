// Event Resize System
//
// Resizes timed events by dragging the top (start) or bottom (end) edge.
// Each handle captures the pointer on its own, independent of the move drag.

use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Local};
use egui::{Pos2, Rect, Vec2};
use thiserror::Error;

use super::time_grid::TimeGrid;
use super::validator::{EditKind, Interval, IntervalValidator};
use crate::models::event::ScheduleEvent;
use crate::utils::date::{local_datetime, minutes_since};

/// How long after a release a click on the event is swallowed.
pub const CLICK_SUPPRESSION: StdDuration = StdDuration::from_millis(150);

/// Height of the grab zone at each edge of a tall event
pub const HANDLE_ZONE: f32 = 12.0;

/// Which edge of the event is being resized
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeHandle {
    /// Top edge - adjusts start time
    Top,
    /// Bottom edge - adjusts end time
    Bottom,
}

/// Grab zones for the two edges of a timed event.
pub struct HandleRects {
    pub top: Rect,
    pub bottom: Rect,
}

impl HandleRects {
    pub fn for_timed_event(event_rect: Rect) -> Self {
        let event_height = event_rect.height();

        // Short events are split in half so both edges stay reachable
        let zone_height = if event_height < HANDLE_ZONE * 3.0 {
            event_height / 2.0
        } else {
            HANDLE_ZONE
        };

        Self {
            top: Rect::from_min_size(
                Pos2::new(event_rect.left(), event_rect.top()),
                Vec2::new(event_rect.width(), zone_height),
            ),
            bottom: Rect::from_min_size(
                Pos2::new(event_rect.left(), event_rect.bottom() - zone_height),
                Vec2::new(event_rect.width(), zone_height),
            ),
        }
    }

    pub fn hit_test(&self, pos: Pos2) -> Option<ResizeHandle> {
        if self.top.contains(pos) {
            Some(ResizeHandle::Top)
        } else if self.bottom.contains(pos) {
            Some(ResizeHandle::Bottom)
        } else {
            None
        }
    }

    pub fn get(&self, handle: ResizeHandle) -> Rect {
        match handle {
            ResizeHandle::Top => self.top,
            ResizeHandle::Bottom => self.bottom,
        }
    }
}

/// Context for an active resize operation
#[derive(Clone, Debug)]
pub struct ResizeContext {
    pub event_id: i64,
    pub version: i64,
    pub handle: ResizeHandle,
    pub original_start: DateTime<Local>,
    pub original_end: DateTime<Local>,
    /// Vertical pointer position at capture
    pub anchor_y: f32,
    /// Last snapped delta reported to the caller
    pub delta_minutes: i64,
}

impl ResizeContext {
    pub fn from_event(event: &ScheduleEvent, handle: ResizeHandle, anchor: Pos2) -> Option<Self> {
        let event_id = event.id?;
        Some(Self {
            event_id,
            version: event.version,
            handle,
            original_start: event.start,
            original_end: event.end,
            anchor_y: anchor.y,
            delta_minutes: 0,
        })
    }

    fn original_interval(&self) -> Interval {
        let day = self.original_start.date_naive();
        Interval::new(
            minutes_since(day, self.original_start.naive_local()),
            minutes_since(day, self.original_end.naive_local()),
        )
    }

    /// The interval after applying `delta_minutes` to the captured edge.
    /// Both edges land on the snap grid, including one stored off it.
    pub fn adjusted_interval(&self, grid: &TimeGrid, delta_minutes: i64) -> Interval {
        let original = self.original_interval();
        let (start, end) = match self.handle {
            ResizeHandle::Top => (original.start + delta_minutes, original.end),
            ResizeHandle::Bottom => (original.start, original.end + delta_minutes),
        };
        Interval::new(grid.snap(start), grid.snap(end))
    }
}

/// Live feedback while the handle is held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResizePreview {
    pub event_id: i64,
    pub handle: ResizeHandle,
    pub delta_minutes: i64,
    pub interval: Interval,
}

/// Accepted resize, ready for a version-checked write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResizeCommit {
    pub event_id: i64,
    pub version: i64,
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResizeRejection {
    #[error("handle released without a change")]
    Unchanged,
    #[error("resized event would be shorter than {0} minutes")]
    TooShort(i64),
    #[error("start would no longer precede end")]
    Inverted,
    #[error("resized time does not exist in the local time zone")]
    InvalidLocalTime,
}

/// Pointer-capture state machine for edge resizing in one grid.
#[derive(Debug, Default)]
pub struct ResizeManager {
    active: Option<ResizeContext>,
    released_at: Option<Instant>,
}

impl ResizeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the pointer on `handle`. Ignored while another resize is live.
    pub fn begin(&mut self, event: &ScheduleEvent, handle: ResizeHandle, anchor: Pos2) -> bool {
        if self.active.is_some() {
            return false;
        }
        match ResizeContext::from_event(event, handle, anchor) {
            Some(context) => {
                self.active = Some(context);
                true
            }
            None => false,
        }
    }

    pub fn active(&self) -> Option<&ResizeContext> {
        self.active.as_ref()
    }

    pub fn is_resizing_event(&self, event_id: i64) -> bool {
        self.active.as_ref().is_some_and(|c| c.event_id == event_id)
    }

    /// Report the snapped delta for the current pointer position.
    pub fn pointer_move(&mut self, grid: &TimeGrid, pointer: Pos2) -> Option<ResizePreview> {
        let context = self.active.as_mut()?;
        let delta_minutes = grid.delta_to_minutes(pointer.y - context.anchor_y);
        context.delta_minutes = delta_minutes;
        Some(ResizePreview {
            event_id: context.event_id,
            handle: context.handle,
            delta_minutes,
            interval: context.adjusted_interval(grid, delta_minutes),
        })
    }

    /// Release the capture. `None` when no resize was active.
    pub fn pointer_up(
        &mut self,
        grid: &TimeGrid,
        pointer: Pos2,
        now: Instant,
    ) -> Option<Result<ResizeCommit, ResizeRejection>> {
        let context = self.active.take()?;
        self.released_at = Some(now);

        let delta_minutes = grid.delta_to_minutes(pointer.y - context.anchor_y);
        let outcome = Self::resolve(grid, &context, delta_minutes);
        if let Err(rejection) = &outcome {
            log::debug!("Discarding resize of event {}: {}", context.event_id, rejection);
        }
        Some(outcome)
    }

    fn resolve(
        grid: &TimeGrid,
        context: &ResizeContext,
        delta_minutes: i64,
    ) -> Result<ResizeCommit, ResizeRejection> {
        if delta_minutes == 0 {
            return Err(ResizeRejection::Unchanged);
        }

        let adjusted = context.adjusted_interval(grid, delta_minutes);
        if adjusted.start >= adjusted.end {
            return Err(ResizeRejection::Inverted);
        }

        let validator = IntervalValidator::new(grid);
        let minimum = validator.min_duration(EditKind::Resize);
        let clamped = validator
            .clamp_to_grid(adjusted, EditKind::Resize)
            .map_err(|_| ResizeRejection::TooShort(minimum))?;

        let day = context.original_start.date_naive();
        let start = local_datetime(day, clamped.start).ok_or(ResizeRejection::InvalidLocalTime)?;
        let end = local_datetime(day, clamped.end).ok_or(ResizeRejection::InvalidLocalTime)?;

        if start == context.original_start && end == context.original_end {
            return Err(ResizeRejection::Unchanged);
        }

        Ok(ResizeCommit {
            event_id: context.event_id,
            version: context.version,
            start,
            end,
        })
    }

    /// True inside the short window after a release, when the synthetic
    /// click that follows must not open the event details.
    pub fn suppresses_click(&self, now: Instant) -> bool {
        self.released_at
            .is_some_and(|released| now.saturating_duration_since(released) < CLICK_SUPPRESSION)
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

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
    }

    fn stored(start: DateTime<Local>, end: DateTime<Local>) -> ScheduleEvent {
        let mut event = ScheduleEvent::appointment(1, start, end).unwrap();
        event.id = Some(11);
        event.version = 2;
        event
    }

    fn anchor() -> Pos2 {
        Pos2::new(50.0, 100.0)
    }

    #[test]
    fn test_bottom_edge_snaps_to_nearest_ten() {
        let grid = TimeGrid::default();
        let mut manager = ResizeManager::new();
        assert!(manager.begin(&stored(at(9, 0), at(10, 0)), ResizeHandle::Bottom, anchor()));

        let commit = manager
            .pointer_up(&grid, Pos2::new(50.0, 123.0), Instant::now())
            .unwrap()
            .unwrap();
        assert_eq!(commit.start, at(9, 0));
        assert_eq!(commit.end, at(10, 20));
        assert_eq!(commit.version, 2);
    }

    #[test]
    fn test_unaligned_event_is_aligned_by_resize() {
        let grid = TimeGrid::default();
        let mut manager = ResizeManager::new();
        manager.begin(&stored(at(9, 3), at(9, 57)), ResizeHandle::Bottom, anchor());

        let commit = manager
            .pointer_up(&grid, Pos2::new(50.0, 120.0), Instant::now())
            .unwrap()
            .unwrap();
        assert_eq!(commit.start, at(9, 0));
        assert_eq!(commit.end, at(10, 20));
    }

    #[test]
    fn test_top_edge_moves_start() {
        let grid = TimeGrid::default();
        let mut manager = ResizeManager::new();
        manager.begin(&stored(at(9, 0), at(10, 0)), ResizeHandle::Top, anchor());

        let commit = manager
            .pointer_up(&grid, Pos2::new(50.0, 70.0), Instant::now())
            .unwrap()
            .unwrap();
        assert_eq!(commit.start, at(8, 30));
        assert_eq!(commit.end, at(10, 0));
    }

    #[test]
    fn test_preview_reports_every_snapped_delta() {
        let grid = TimeGrid::default();
        let mut manager = ResizeManager::new();
        manager.begin(&stored(at(9, 0), at(10, 0)), ResizeHandle::Bottom, anchor());

        let first = manager.pointer_move(&grid, Pos2::new(50.0, 104.0)).unwrap();
        assert_eq!(first.delta_minutes, 0);
        let second = manager.pointer_move(&grid, Pos2::new(50.0, 117.0)).unwrap();
        assert_eq!(second.delta_minutes, 20);
        assert_eq!(second.interval, Interval::new(540, 620));
        assert!(manager.is_resizing_event(11));
    }

    #[test]
    fn test_zero_delta_release_is_a_cancel() {
        let grid = TimeGrid::default();
        let mut manager = ResizeManager::new();
        manager.begin(&stored(at(9, 0), at(10, 0)), ResizeHandle::Bottom, anchor());

        let outcome = manager.pointer_up(&grid, Pos2::new(50.0, 102.0), Instant::now());
        assert_eq!(outcome, Some(Err(ResizeRejection::Unchanged)));
        assert!(manager.active().is_none());
    }

    #[test]
    fn test_shrinking_below_minimum_is_rejected() {
        let grid = TimeGrid::new(crate::models::grid_config::TimeGridConfig {
            min_resize_minutes: 20,
            ..Default::default()
        });
        let mut manager = ResizeManager::new();
        manager.begin(&stored(at(9, 0), at(9, 30)), ResizeHandle::Bottom, anchor());

        let outcome = manager.pointer_up(&grid, Pos2::new(50.0, 80.0), Instant::now());
        assert_eq!(outcome, Some(Err(ResizeRejection::TooShort(20))));
    }

    #[test]
    fn test_crossing_edges_is_rejected() {
        let grid = TimeGrid::default();
        let mut manager = ResizeManager::new();
        manager.begin(&stored(at(9, 0), at(9, 30)), ResizeHandle::Top, anchor());

        let outcome = manager.pointer_up(&grid, Pos2::new(50.0, 140.0), Instant::now());
        assert_eq!(outcome, Some(Err(ResizeRejection::Inverted)));
    }

    #[test]
    fn test_resize_past_grid_end_is_clamped() {
        let grid = TimeGrid::default();
        let mut manager = ResizeManager::new();
        manager.begin(&stored(at(21, 0), at(21, 30)), ResizeHandle::Bottom, anchor());

        let commit = manager
            .pointer_up(&grid, Pos2::new(50.0, 190.0), Instant::now())
            .unwrap()
            .unwrap();
        assert_eq!(commit.end, at(22, 0));
    }

    #[test]
    fn test_click_suppressed_shortly_after_release() {
        let grid = TimeGrid::default();
        let mut manager = ResizeManager::new();
        manager.begin(&stored(at(9, 0), at(10, 0)), ResizeHandle::Bottom, anchor());

        let released = Instant::now();
        manager.pointer_up(&grid, Pos2::new(50.0, 130.0), released);

        assert!(manager.suppresses_click(released + StdDuration::from_millis(100)));
        assert!(!manager.suppresses_click(released + StdDuration::from_millis(200)));
    }

    #[test]
    fn test_second_capture_is_refused() {
        let mut manager = ResizeManager::new();
        let event = stored(at(9, 0), at(10, 0));
        assert!(manager.begin(&event, ResizeHandle::Top, anchor()));
        assert!(!manager.begin(&event, ResizeHandle::Bottom, anchor()));
    }

    #[test]
    fn test_handle_hit_test() {
        let rect = Rect::from_min_size(Pos2::new(100.0, 100.0), Vec2::new(200.0, 60.0));
        let handles = HandleRects::for_timed_event(rect);

        assert_eq!(handles.hit_test(Pos2::new(200.0, 101.0)), Some(ResizeHandle::Top));
        assert_eq!(handles.hit_test(Pos2::new(200.0, 159.0)), Some(ResizeHandle::Bottom));
        assert_eq!(handles.hit_test(Pos2::new(200.0, 130.0)), None);
    }

    #[test]
    fn test_small_event_split_in_halves() {
        let rect = Rect::from_min_size(Pos2::new(0.0, 0.0), Vec2::new(100.0, 20.0));
        let handles = HandleRects::for_timed_event(rect);

        assert_eq!(handles.get(ResizeHandle::Top).height(), 10.0);
        assert_eq!(handles.hit_test(Pos2::new(50.0, 5.0)), Some(ResizeHandle::Top));
        assert_eq!(handles.hit_test(Pos2::new(50.0, 15.0)), Some(ResizeHandle::Bottom));
    }
}
