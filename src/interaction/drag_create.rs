//! Drag-to-create on empty grid space.
//!
//! `Idle -> Drafting -> Idle`. Pointer-down over free space starts a draft
//! centred on the cursor, movement reshapes it, pointer-up hands the final
//! [`DraftSelection`] to the creation dialog. Abandoning the draft happens in
//! that dialog, not here.

use chrono::{DateTime, Local, NaiveDate};

use super::time_grid::TimeGrid;
use super::validator::{EditKind, Interval, IntervalValidator};
use crate::models::event::ScheduleEvent;
use crate::utils::date::local_datetime;

/// A finished draft: where and when the new event should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftSelection {
    pub resource_id: i64,
    pub day: NaiveDate,
    pub interval: Interval,
}

impl DraftSelection {
    pub fn start(&self) -> Option<DateTime<Local>> {
        local_datetime(self.day, self.interval.start)
    }

    pub fn end(&self) -> Option<DateTime<Local>> {
        local_datetime(self.day, self.interval.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftSession {
    pub resource_id: i64,
    pub day: NaiveDate,
    pub anchor: i64,
    pub current: i64,
    pub candidate: Interval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragCreateState {
    #[default]
    Idle,
    Drafting(DraftSession),
}

/// Result of a pointer-down on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftStart {
    Started(Interval),
    /// Pointer is over an existing event
    OverEvent,
    /// Another column already owns the pointer
    Busy,
    OutsideGrid,
}

/// Owns the pointer sequence for drag-to-create in one grid.
#[derive(Debug, Clone)]
pub struct DragCreateController {
    grid: TimeGrid,
    state: DragCreateState,
}

impl DragCreateController {
    pub fn new(grid: TimeGrid) -> Self {
        Self {
            grid,
            state: DragCreateState::Idle,
        }
    }

    pub fn state(&self) -> &DragCreateState {
        &self.state
    }

    pub fn draft(&self) -> Option<&DraftSession> {
        match &self.state {
            DragCreateState::Drafting(session) => Some(session),
            DragCreateState::Idle => None,
        }
    }

    pub fn is_drafting(&self) -> bool {
        self.draft().is_some()
    }

    /// Pointer-down at `offset` inside the `(resource_id, day)` column.
    ///
    /// `column_events` are the events already shown in that column.
    pub fn pointer_down(
        &mut self,
        resource_id: i64,
        day: NaiveDate,
        offset: f32,
        column_events: &[ScheduleEvent],
    ) -> DraftStart {
        if let Some(active) = self.draft() {
            if active.resource_id != resource_id || active.day != day {
                log::debug!(
                    "Ignoring pointer-down on resource {} {} while drafting on resource {} {}",
                    resource_id,
                    day,
                    active.resource_id,
                    active.day
                );
                return DraftStart::Busy;
            }
        }

        let validator = IntervalValidator::new(&self.grid);
        let pointer_minute = self.grid.pointer_minute(offset);
        if !validator.can_offer_create(pointer_minute, column_events) {
            return if self.grid.contains_minute(pointer_minute)
                && pointer_minute < self.grid.end_minutes()
            {
                DraftStart::OverEvent
            } else {
                DraftStart::OutsideGrid
            };
        }

        let min_duration = validator.min_duration(EditKind::Create);
        if !self.grid.fits(min_duration) {
            log::debug!(
                "Minimum draft of {} minutes does not fit the display window",
                min_duration
            );
            return DraftStart::OutsideGrid;
        }

        let half_box = self.grid.minutes_to_distance(min_duration / 2);
        let anchor = self
            .grid
            .position_to_minutes(offset - half_box)
            .clamp(self.grid.start_minutes(), self.grid.end_minutes() - min_duration);

        let candidate = Interval::new(anchor, anchor + min_duration);
        self.state = DragCreateState::Drafting(DraftSession {
            resource_id,
            day,
            anchor,
            current: anchor,
            candidate,
        });

        DraftStart::Started(candidate)
    }

    /// Pointer moved to `offset`. Returns the reshaped candidate while drafting.
    pub fn pointer_move(&mut self, offset: f32) -> Option<Interval> {
        let DragCreateState::Drafting(mut session) = self.state else {
            return None;
        };

        session.current = self.grid.position_to_minutes(offset);
        let reshaped = Self::candidate_for(&self.grid, session.anchor, session.current);
        match IntervalValidator::new(&self.grid).clamp_to_grid(reshaped, EditKind::Create) {
            Ok(candidate) => session.candidate = candidate,
            Err(rejection) => {
                log::debug!("Keeping previous draft: {}", rejection);
            }
        }

        self.state = DragCreateState::Drafting(session);
        Some(session.candidate)
    }

    /// Pointer released anywhere. Yields the selection and returns to idle.
    pub fn pointer_up(&mut self) -> Option<DraftSelection> {
        let DragCreateState::Drafting(session) = std::mem::take(&mut self.state) else {
            return None;
        };

        Some(DraftSelection {
            resource_id: session.resource_id,
            day: session.day,
            interval: session.candidate,
        })
    }

    /// Span between anchor and pointer, padded to the minimum length in the
    /// direction of travel.
    fn candidate_for(grid: &TimeGrid, anchor: i64, current: i64) -> Interval {
        let min_duration = grid.config().min_create_minutes;
        if current >= anchor {
            Interval::new(anchor, current.max(anchor + min_duration))
        } else {
            Interval::new(current.min(anchor - min_duration), anchor)
        }
    }
}
