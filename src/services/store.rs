//! The Data Store seam used by the sync layer and the sweeper.

use anyhow::Result;
use chrono::{DateTime, Local};
use thiserror::Error;

use crate::models::event::{EventStatus, ScheduleEvent};
use crate::models::resource::Resource;
use crate::services::database::Database;
use crate::services::event::EventService;
use crate::services::resource::ResourceService;

/// Conditions a caller has to tell apart from plain I/O failures.
///
/// Carried inside `anyhow::Error`; recover with `downcast_ref::<StoreError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("event {id} was changed by someone else (expected version {expected})")]
    VersionConflict { id: i64, expected: i64 },
    #[error("event {0} not found")]
    NotFound(i64),
    #[error("invalid event: {0}")]
    Invalid(String),
}

/// Persistence collaborator for schedule events and resources.
#[cfg_attr(test, mockall::automock)]
pub trait ScheduleStore {
    /// Events overlapping the half-open range `[start, end)`.
    fn list_events(&self, start: DateTime<Local>, end: DateTime<Local>) -> Result<Vec<ScheduleEvent>>;

    fn get_event(&self, id: i64) -> Result<Option<ScheduleEvent>>;

    /// Inserts a new event and returns it with its id and initial version.
    fn create_event(&self, event: ScheduleEvent) -> Result<ScheduleEvent>;

    /// Writes `event` only if the stored version still equals `event.version`.
    /// Returns the stored event with its advanced version.
    fn update_event(&self, event: &ScheduleEvent) -> Result<ScheduleEvent>;

    /// Moves every listed event currently in `from` to `to`; returns rows changed.
    fn update_status_batch(&self, ids: &[i64], from: EventStatus, to: EventStatus) -> Result<usize>;

    /// Deletes the event only if the stored version equals `version`.
    fn delete_event(&self, id: i64, version: i64) -> Result<()>;

    fn list_resources(&self) -> Result<Vec<Resource>>;
}

impl ScheduleStore for Database {
    fn list_events(&self, start: DateTime<Local>, end: DateTime<Local>) -> Result<Vec<ScheduleEvent>> {
        EventService::new(self.connection()).find_by_date_range(start, end)
    }

    fn get_event(&self, id: i64) -> Result<Option<ScheduleEvent>> {
        EventService::new(self.connection()).get(id)
    }

    fn create_event(&self, event: ScheduleEvent) -> Result<ScheduleEvent> {
        EventService::new(self.connection()).create(event)
    }

    fn update_event(&self, event: &ScheduleEvent) -> Result<ScheduleEvent> {
        EventService::new(self.connection()).update(event)
    }

    fn update_status_batch(&self, ids: &[i64], from: EventStatus, to: EventStatus) -> Result<usize> {
        EventService::new(self.connection()).update_status_batch(ids, from, to)
    }

    fn delete_event(&self, id: i64, version: i64) -> Result<()> {
        EventService::new(self.connection()).delete(id, version)
    }

    fn list_resources(&self) -> Result<Vec<Resource>> {
        ResourceService::new(self.connection()).list_active()
    }
}
