use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Local, NaiveDate};

use crate::models::event::ScheduleEvent;
use crate::models::resource::Resource;
use crate::utils::date::week_range;

/// The visible week, held as one unit. It is only ever replaced wholesale.
#[derive(Debug, Clone)]
pub struct WeekCache {
    week_start: NaiveDate,
    events: Vec<ScheduleEvent>,
    resources: Vec<Resource>,
    resource_filter: Option<HashSet<i64>>,
    stale: bool,
    loaded_at: Option<DateTime<Local>>,
}

impl WeekCache {
    pub fn new(week_start: NaiveDate) -> Self {
        Self {
            week_start,
            events: Vec::new(),
            resources: Vec::new(),
            resource_filter: None,
            stale: true,
            loaded_at: None,
        }
    }

    pub fn week_start(&self) -> NaiveDate {
        self.week_start
    }

    /// Switching weeks drops the old contents.
    pub fn set_week_start(&mut self, week_start: NaiveDate) {
        if week_start != self.week_start {
            self.week_start = week_start;
            self.events.clear();
            self.stale = true;
        }
    }

    pub fn range(&self) -> Option<(DateTime<Local>, DateTime<Local>)> {
        week_range(self.week_start)
    }

    pub fn replace(
        &mut self,
        events: Vec<ScheduleEvent>,
        resources: Vec<Resource>,
        now: DateTime<Local>,
    ) {
        self.events = events;
        self.resources = resources;
        self.stale = false;
        self.loaded_at = Some(now);
    }

    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn loaded_at(&self) -> Option<DateTime<Local>> {
        self.loaded_at
    }

    /// `None` shows every resource.
    pub fn set_resource_filter(&mut self, filter: Option<HashSet<i64>>) {
        self.resource_filter = filter;
    }

    fn is_included(&self, resource_id: i64) -> bool {
        self.resource_filter
            .as_ref()
            .map_or(true, |included| included.contains(&resource_id))
    }

    pub fn events(&self) -> &[ScheduleEvent] {
        &self.events
    }

    pub fn find(&self, event_id: i64) -> Option<&ScheduleEvent> {
        self.events.iter().find(|e| e.id == Some(event_id))
    }

    pub fn visible_events(&self) -> impl Iterator<Item = &ScheduleEvent> + '_ {
        self.events
            .iter()
            .filter(move |event| self.is_included(event.resource_id))
    }

    /// Every resource, flagged with whether its column is shown.
    pub fn visible_resources(&self) -> Vec<Resource> {
        self.resources
            .iter()
            .map(|resource| Resource {
                included: self.is_included(resource.id),
                ..resource.clone()
            })
            .collect()
    }

    /// Events drawn in one column: same resource, starting on `day`.
    pub fn events_for_column(&self, resource_id: i64, day: NaiveDate) -> Vec<&ScheduleEvent> {
        self.events
            .iter()
            .filter(|event| event.resource_id == resource_id && event.day() == day)
            .collect()
    }

    /// Changes whenever an event in view is added, removed, or rewritten.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.week_start.hash(&mut hasher);
        for event in self.visible_events() {
            event.id.hash(&mut hasher);
            event.version.hash(&mut hasher);
        }
        hasher.finish()
    }
}
