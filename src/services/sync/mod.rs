//! Commits grid mutations and keeps the visible week in step with the store.
//!
//! Every write carries the version the caller last saw. After any write, and
//! after any foreign change notification, the whole week is fetched again;
//! the cache is never patched in place.

mod week_cache;

pub use week_cache::WeekCache;

use std::collections::HashSet;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, NaiveDate, Weekday};
use thiserror::Error;

use crate::interaction::{
    DraftSelection, EditKind, Interval, IntervalValidator, MoveCommit, ResizeCommit, TimeGrid,
};
use crate::models::event::{EventKind, EventStatus, ScheduleEvent};
use crate::models::resource::Resource;
use crate::services::feed::{
    ChangeFeed, ChangeNotification, ChangeTable, FeedSubscription, SessionId,
};
use crate::services::store::{ScheduleStore, StoreError};
use crate::utils::date::{local_datetime, minutes_of_day, week_start};

/// Why a commit did not go through, phrased for the person who tried it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    /// The change itself is not allowed
    #[error("{0}")]
    Rejected(String),
    /// Someone else changed or removed the event first
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Transient(String),
}

impl CommitError {
    fn from_store(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<StoreError>() {
            Some(StoreError::VersionConflict { .. }) => CommitError::Conflict(
                "This appointment was changed by someone else. The schedule has been refreshed."
                    .to_string(),
            ),
            Some(StoreError::NotFound(_)) => CommitError::Conflict(
                "This appointment no longer exists. The schedule has been refreshed.".to_string(),
            ),
            Some(StoreError::Invalid(reason)) => CommitError::Rejected(reason.clone()),
            None => CommitError::Transient(format!("{:#}", err)),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            CommitError::Rejected(reason) => format!("Change not allowed: {}", reason),
            CommitError::Conflict(reason) => reason.clone(),
            CommitError::Transient(reason) => {
                format!("Could not save the change, please try again. ({})", reason)
            }
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CommitError::Conflict(_))
    }
}

/// One session's view of the schedule: the visible week plus the write path.
pub struct ScheduleSync<'a, S: ScheduleStore + ?Sized> {
    store: &'a S,
    grid: TimeGrid,
    facility_id: String,
    session: SessionId,
    feed: Option<ChangeFeed>,
    subscription: Option<FeedSubscription>,
    cache: WeekCache,
}

impl<'a, S: ScheduleStore + ?Sized> ScheduleSync<'a, S> {
    pub fn new(store: &'a S, grid: TimeGrid, facility_id: impl Into<String>) -> Self {
        let today = Local::now().date_naive();
        Self {
            store,
            grid,
            facility_id: facility_id.into(),
            session: SessionId::generate(),
            feed: None,
            subscription: None,
            cache: WeekCache::new(week_start(today, Weekday::Mon)),
        }
    }

    /// Publish this session's writes to `feed` and listen for everyone else's.
    pub fn with_feed(mut self, feed: &ChangeFeed) -> Self {
        self.subscription = Some(feed.subscribe(self.facility_id.clone(), self.session.clone()));
        self.feed = Some(feed.clone());
        self
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn facility_id(&self) -> &str {
        &self.facility_id
    }

    pub fn cache(&self) -> &WeekCache {
        &self.cache
    }

    /// Shows the week containing `day` and loads it.
    pub fn load_week(&mut self, day: NaiveDate) -> Result<()> {
        self.cache.set_week_start(week_start(day, Weekday::Mon));
        self.refetch()
    }

    /// Reloads the whole visible week from the store.
    pub fn refetch(&mut self) -> Result<()> {
        let (start, end) = self
            .cache
            .range()
            .ok_or_else(|| anyhow!("Week of {} has no valid local range", self.cache.week_start()))?;

        let loaded = self
            .store
            .list_events(start, end)
            .and_then(|events| Ok((events, self.store.list_resources()?)));

        match loaded {
            Ok((events, resources)) => {
                log::debug!(
                    "Loaded {} events and {} resources for week of {}",
                    events.len(),
                    resources.len(),
                    self.cache.week_start()
                );
                self.cache.replace(events, resources, Local::now());
                Ok(())
            }
            Err(err) => {
                self.cache.mark_stale();
                Err(err).context("Failed to refresh the visible week")
            }
        }
    }

    /// Drains the change feed and refetches if anyone else touched the
    /// facility. Returns whether a refetch happened.
    pub fn poll_notifications(&mut self) -> Result<bool> {
        let Some(subscription) = self.subscription.as_mut() else {
            return Ok(false);
        };

        let pending = subscription.drain();
        if !pending.requires_refetch() {
            return Ok(false);
        }

        log::debug!(
            "{} foreign change(s) for facility {}, refetching",
            pending.notifications.len(),
            self.facility_id
        );
        self.refetch()?;
        Ok(true)
    }

    pub fn set_resource_filter(&mut self, filter: Option<HashSet<i64>>) {
        self.cache.set_resource_filter(filter);
    }

    pub fn visible_events(&self) -> Vec<&ScheduleEvent> {
        self.cache.visible_events().collect()
    }

    pub fn visible_resources(&self) -> Vec<Resource> {
        self.cache.visible_resources()
    }

    pub fn events_for_column(&self, resource_id: i64, day: NaiveDate) -> Vec<&ScheduleEvent> {
        self.cache.events_for_column(resource_id, day)
    }

    /// Whether hovering `minute` in the column should offer "create here".
    pub fn can_offer_create(&self, resource_id: i64, day: NaiveDate, minute: i64) -> bool {
        IntervalValidator::new(&self.grid)
            .can_offer_create(minute, self.cache.events_for_column(resource_id, day))
    }

    /// Saves the event sketched by a drag-create gesture.
    pub fn commit_create(
        &mut self,
        selection: &DraftSelection,
        kind: EventKind,
        note: Option<String>,
    ) -> Result<ScheduleEvent, CommitError> {
        let interval = IntervalValidator::new(&self.grid)
            .clamp_to_grid(selection.interval, EditKind::Create)
            .map_err(|rejection| self.reject(rejection.to_string()))?;

        let event = self.build_event(selection.resource_id, selection.day, interval, kind)?;
        let event = match note {
            Some(note) => event.with_note(note),
            None => event,
        };
        self.create(event)
    }

    /// Books a patient directly, without a drag gesture. The start is
    /// snapped and the span padded and clamped like a drafted selection.
    pub fn create_for_patient(
        &mut self,
        resource_id: i64,
        start: DateTime<Local>,
        duration_minutes: i64,
        patient_id: i64,
    ) -> Result<ScheduleEvent, CommitError> {
        let validator = IntervalValidator::new(&self.grid);
        let start_minutes = self.grid.snap(minutes_of_day(start));
        let duration = duration_minutes.max(validator.min_duration(EditKind::Create));
        let interval = validator
            .clamp_to_grid(Interval::new(start_minutes, start_minutes + duration), EditKind::Create)
            .map_err(|rejection| self.reject(rejection.to_string()))?;

        let event = self
            .build_event(resource_id, start.date_naive(), interval, EventKind::appointment())?
            .with_patient(patient_id);
        self.create(event)
    }

    pub fn commit_move(&mut self, commit: &MoveCommit) -> Result<ScheduleEvent, CommitError> {
        let mut event = self.current_event(commit.event_id)?;
        event.resource_id = commit.resource_id;
        event.start = commit.start;
        event.end = commit.end;
        event.version = commit.version;
        self.update(event)
    }

    pub fn commit_resize(&mut self, commit: &ResizeCommit) -> Result<ScheduleEvent, CommitError> {
        let mut event = self.current_event(commit.event_id)?;
        event.start = commit.start;
        event.end = commit.end;
        event.version = commit.version;
        self.update(event)
    }

    /// Explicit status change. Only pending events can change status;
    /// asking for the status an event already has changes nothing.
    pub fn transition_status(
        &mut self,
        event_id: i64,
        version: i64,
        status: EventStatus,
    ) -> Result<ScheduleEvent, CommitError> {
        let mut event = self.current_event(event_id)?;
        if event.status == status {
            return Ok(event);
        }
        if !event.status.can_transition_to(status) {
            return Err(self.reject(format!(
                "a {} appointment cannot become {}",
                event.status, status
            )));
        }

        event.status = status;
        event.version = version;
        self.update(event)
    }

    pub fn delete(&mut self, event_id: i64, version: i64) -> Result<(), CommitError> {
        match self.store.delete_event(event_id, version) {
            Ok(()) => {
                log::info!("Deleted event {}", event_id);
                self.after_write(ChangeTable::Events);
                Ok(())
            }
            Err(err) => Err(self.after_failure("delete", event_id, err)),
        }
    }

    /// Moves `ids` from `from` to `to` in one request, then refreshes the week.
    pub fn update_status_batch(
        &mut self,
        ids: &[i64],
        from: EventStatus,
        to: EventStatus,
    ) -> Result<usize> {
        let changed = self.store.update_status_batch(ids, from, to)?;
        if changed > 0 {
            self.publish(ChangeTable::Events);
        }
        if let Err(err) = self.refetch() {
            log::warn!("{:#}", err);
        }
        Ok(changed)
    }

    fn build_event(
        &self,
        resource_id: i64,
        day: NaiveDate,
        interval: Interval,
        kind: EventKind,
    ) -> Result<ScheduleEvent, CommitError> {
        let invalid_time = || {
            CommitError::Rejected("that time does not exist on this day".to_string())
        };
        let start = local_datetime(day, interval.start).ok_or_else(invalid_time)?;
        let end = local_datetime(day, interval.end).ok_or_else(invalid_time)?;
        ScheduleEvent::new(resource_id, kind, start, end).map_err(CommitError::Rejected)
    }

    /// The event as this session last saw it, falling back to the store for
    /// events outside the cached week.
    fn current_event(&mut self, event_id: i64) -> Result<ScheduleEvent, CommitError> {
        if let Some(event) = self.cache.find(event_id) {
            return Ok(event.clone());
        }
        match self.store.get_event(event_id) {
            Ok(Some(event)) => Ok(event),
            Ok(None) => Err(self.after_failure("load", event_id, StoreError::NotFound(event_id).into())),
            Err(err) => Err(self.after_failure("load", event_id, err)),
        }
    }

    fn create(&mut self, event: ScheduleEvent) -> Result<ScheduleEvent, CommitError> {
        match self.store.create_event(event) {
            Ok(created) => {
                log::info!(
                    "Created {} {:?} for resource {} at {}",
                    created.kind.as_str(),
                    created.id,
                    created.resource_id,
                    created.start
                );
                self.after_write(ChangeTable::Events);
                Ok(created)
            }
            Err(err) => {
                let error = CommitError::from_store(&err);
                log::warn!("Create failed: {:#}", err);
                self.refetch_after_failure();
                Err(error)
            }
        }
    }

    fn update(&mut self, event: ScheduleEvent) -> Result<ScheduleEvent, CommitError> {
        let event_id = event.id.unwrap_or_default();
        match self.store.update_event(&event) {
            Ok(stored) => {
                log::info!("Updated event {} to version {}", event_id, stored.version);
                self.after_write(ChangeTable::Events);
                Ok(stored)
            }
            Err(err) => Err(self.after_failure("update", event_id, err)),
        }
    }

    fn reject(&self, reason: String) -> CommitError {
        log::debug!("Rejected change: {}", reason);
        CommitError::Rejected(reason)
    }

    fn publish(&self, table: ChangeTable) {
        if let Some(feed) = &self.feed {
            feed.publish(ChangeNotification::new(
                self.facility_id.clone(),
                table,
                self.session.clone(),
            ));
        }
    }

    /// Our own writes never come back through the feed, so refetch here.
    fn after_write(&mut self, table: ChangeTable) {
        self.publish(table);
        if let Err(err) = self.refetch() {
            log::warn!("Write saved but refresh failed: {:#}", err);
        }
    }

    fn after_failure(&mut self, action: &str, event_id: i64, err: anyhow::Error) -> CommitError {
        let error = CommitError::from_store(&err);
        match &error {
            CommitError::Transient(_) => {
                log::error!("Failed to {} event {}: {:#}", action, event_id, err)
            }
            _ => log::warn!("Failed to {} event {}: {:#}", action, event_id, err),
        }
        self.refetch_after_failure();
        error
    }

    /// Reverts to the last known-good state by reloading, never by undoing.
    fn refetch_after_failure(&mut self) {
        if let Err(err) = self.refetch() {
            log::warn!("Refresh after failed write also failed: {:#}", err);
        }
    }
}
