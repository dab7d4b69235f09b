// Event module
// Schedule events: patient appointments and blocked (non-patient) time

use chrono::{DateTime, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::date::minutes_since;

/// Shortest span any stored event may cover.
pub const MIN_EVENT_MINUTES: i64 = 10;

/// Lifecycle status of a schedule event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Completed,
    Cancelled,
    #[serde(rename = "noshow")]
    NoShow,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Completed => "completed",
            EventStatus::Cancelled => "cancelled",
            EventStatus::NoShow => "noshow",
        }
    }

    /// Explicit transitions only leave `Pending`. Re-applying the current
    /// status is accepted as a no-op.
    pub fn can_transition_to(&self, next: EventStatus) -> bool {
        *self == next || (*self == EventStatus::Pending && next != EventStatus::Pending)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Ok(EventStatus::Pending),
            "completed" => Ok(EventStatus::Completed),
            "cancelled" => Ok(EventStatus::Cancelled),
            "noshow" | "no_show" => Ok(EventStatus::NoShow),
            other => Err(format!("Unknown event status: '{}'", other)),
        }
    }
}

/// What occupies the slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EventKind {
    Appointment {
        patient_id: Option<i64>,
        visit_count: u32,
        membership_id: Option<i64>,
    },
    Block {
        title: String,
    },
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Appointment { .. } => "appointment",
            EventKind::Block { .. } => "block",
        }
    }

    pub fn appointment() -> Self {
        EventKind::Appointment {
            patient_id: None,
            visit_count: 0,
            membership_id: None,
        }
    }
}

/// A scheduled slot owned by exactly one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub id: Option<i64>,
    pub resource_id: i64,
    pub kind: EventKind,
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    pub status: EventStatus,
    /// Optimistic concurrency token, advanced by the store on every write
    pub version: i64,
    pub note: Option<String>,
    pub created_at: Option<DateTime<Local>>,
}

impl ScheduleEvent {
    /// Create a pending appointment with no patient attached yet.
    ///
    /// # Examples
    /// ```
    /// use clinic_scheduler::models::event::ScheduleEvent;
    /// use chrono::{Duration, Local, TimeZone};
    ///
    /// let start = Local.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
    /// let event = ScheduleEvent::appointment(1, start, start + Duration::minutes(30)).unwrap();
    /// assert_eq!(event.duration_minutes(), 30);
    /// ```
    pub fn appointment(
        resource_id: i64,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Result<Self, String> {
        Self::new(resource_id, EventKind::appointment(), start, end)
    }

    /// Create blocked time in a resource's column.
    pub fn block(
        resource_id: i64,
        title: impl Into<String>,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Result<Self, String> {
        let kind = EventKind::Block {
            title: title.into(),
        };
        Self::new(resource_id, kind, start, end)
    }

    pub fn new(
        resource_id: i64,
        kind: EventKind,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Result<Self, String> {
        let event = Self {
            id: None,
            resource_id,
            kind,
            start,
            end,
            status: EventStatus::Pending,
            version: 0,
            note: None,
            created_at: None,
        };
        event.validate()?;
        Ok(event)
    }

    pub fn with_patient(mut self, patient_id: i64) -> Self {
        if let EventKind::Appointment {
            patient_id: ref mut slot,
            ..
        } = self.kind
        {
            *slot = Some(patient_id);
        }
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.end <= self.start {
            return Err("Event end time must be after start time".to_string());
        }

        if self.duration() < Duration::minutes(MIN_EVENT_MINUTES) {
            return Err(format!(
                "Event must last at least {} minutes",
                MIN_EVENT_MINUTES
            ));
        }

        if let EventKind::Block { title } = &self.kind {
            if title.trim().is_empty() {
                return Err("Blocked time needs a title".to_string());
            }
        }

        Ok(())
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, EventKind::Block { .. })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// The calendar day the event belongs to: the local date of its start.
    pub fn day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn start_minutes(&self) -> i64 {
        minutes_since(self.day(), self.start.naive_local())
    }

    /// End offset measured from midnight of the event's own day.
    pub fn end_minutes(&self) -> i64 {
        minutes_since(self.day(), self.end.naive_local())
    }

    /// True when both boundaries sit on a `resolution`-minute boundary.
    pub fn is_aligned_to(&self, resolution: i64) -> bool {
        resolution > 0
            && self.start_minutes() % resolution == 0
            && self.end_minutes() % resolution == 0
    }

    pub fn is_elapsed(&self, now: DateTime<Local>) -> bool {
        self.end < now
    }

    /// Status to display: pending slots whose end has passed read as completed.
    /// This never changes the persisted status.
    pub fn effective_status(&self, now: DateTime<Local>) -> EventStatus {
        if self.status == EventStatus::Pending && self.is_elapsed(now) {
            EventStatus::Completed
        } else {
            self.status
        }
    }

    pub fn label(&self) -> String {
        match &self.kind {
            EventKind::Block { title } => title.clone(),
            EventKind::Appointment {
                patient_id: Some(patient_id),
                visit_count,
                ..
            } => format!("Patient #{} (visit {})", patient_id, visit_count),
            EventKind::Appointment { .. } => "Appointment".to_string(),
        }
    }
}
