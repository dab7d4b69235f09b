use super::shared::{map_event_row, to_storage, EVENT_COLUMNS};
use super::EventService;
use crate::models::event::{EventKind, EventStatus, ScheduleEvent};
use crate::services::store::StoreError;
use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension};

/// Version a freshly inserted event starts at.
const INITIAL_VERSION: i64 = 1;

struct KindColumns {
    patient_id: Option<i64>,
    visit_count: i64,
    membership_id: Option<i64>,
    title: Option<String>,
}

fn kind_columns(kind: &EventKind) -> KindColumns {
    match kind {
        EventKind::Appointment {
            patient_id,
            visit_count,
            membership_id,
        } => KindColumns {
            patient_id: *patient_id,
            visit_count: i64::from(*visit_count),
            membership_id: *membership_id,
            title: None,
        },
        EventKind::Block { title } => KindColumns {
            patient_id: None,
            visit_count: 0,
            membership_id: None,
            title: Some(title.clone()),
        },
    }
}

impl<'a> EventService<'a> {
    /// Insert a new event. The stored event starts at version 1.
    pub fn create(&self, mut event: ScheduleEvent) -> Result<ScheduleEvent> {
        event.validate().map_err(StoreError::Invalid)?;

        let now = Local::now();
        let stamp = to_storage(now);
        let columns = kind_columns(&event.kind);

        self.conn
            .execute(
                "INSERT INTO schedule_events (
                    kind, resource_id, patient_id, visit_count, membership_id, title,
                    start_datetime, end_datetime, status, version, note,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    event.kind.as_str(),
                    event.resource_id,
                    columns.patient_id,
                    columns.visit_count,
                    columns.membership_id,
                    columns.title,
                    to_storage(event.start),
                    to_storage(event.end),
                    event.status.as_str(),
                    INITIAL_VERSION,
                    event.note,
                    &stamp,
                    &stamp,
                ],
            )
            .context("Failed to insert schedule event")?;

        event.id = Some(self.conn.last_insert_rowid());
        event.version = INITIAL_VERSION;
        event.created_at = Some(now);

        log::debug!(
            "Created {} {:?} for resource {}",
            event.kind.as_str(),
            event.id,
            event.resource_id
        );
        Ok(event)
    }

    /// Retrieve an event by ID.
    pub fn get(&self, id: i64) -> Result<Option<ScheduleEvent>> {
        let sql = format!("SELECT {} FROM schedule_events WHERE id = ?", EVENT_COLUMNS);
        let event = self
            .conn
            .query_row(&sql, [id], map_event_row)
            .optional()
            .with_context(|| format!("Failed to load event {}", id))?;
        Ok(event)
    }

    /// Write every field of `event`, provided the stored version still equals
    /// `event.version`. Returns the event as stored, with its new version.
    pub fn update(&self, event: &ScheduleEvent) -> Result<ScheduleEvent> {
        let id = event
            .id
            .ok_or_else(|| StoreError::Invalid("Event ID is required for update".to_string()))?;
        event.validate().map_err(StoreError::Invalid)?;

        let columns = kind_columns(&event.kind);
        let rows_affected = self
            .conn
            .execute(
                "UPDATE schedule_events SET
                    kind = ?, resource_id = ?, patient_id = ?, visit_count = ?,
                    membership_id = ?, title = ?, start_datetime = ?, end_datetime = ?,
                    status = ?, note = ?, version = version + 1, updated_at = ?
                 WHERE id = ? AND version = ?",
                params![
                    event.kind.as_str(),
                    event.resource_id,
                    columns.patient_id,
                    columns.visit_count,
                    columns.membership_id,
                    columns.title,
                    to_storage(event.start),
                    to_storage(event.end),
                    event.status.as_str(),
                    event.note,
                    to_storage(Local::now()),
                    id,
                    event.version,
                ],
            )
            .context("Failed to update schedule event")?;

        if rows_affected == 0 {
            return Err(self.missed_write(id, event.version)?.into());
        }

        let mut stored = event.clone();
        stored.version = event.version + 1;
        Ok(stored)
    }

    /// Move every listed event that is still in `from` over to `to`.
    ///
    /// Events already in another status are skipped, so repeating the same
    /// batch changes nothing. Returns the number of rows changed.
    pub fn update_status_batch(
        &self,
        ids: &[i64],
        from: EventStatus,
        to: EventStatus,
    ) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "UPDATE schedule_events
             SET status = ?, version = version + 1, updated_at = ?
             WHERE status = ? AND id IN ({})",
            placeholders
        );

        let mut values = vec![
            Value::Text(to.as_str().to_string()),
            Value::Text(to_storage(Local::now())),
            Value::Text(from.as_str().to_string()),
        ];
        values.extend(ids.iter().map(|id| Value::Integer(*id)));

        let changed = self
            .conn
            .execute(&sql, params_from_iter(values.iter()))
            .context("Failed to update event statuses")?;

        log::debug!(
            "Batch status {} -> {}: {} of {} rows changed",
            from,
            to,
            changed,
            ids.len()
        );
        Ok(changed)
    }

    /// Delete an event if the stored version still equals `version`.
    pub fn delete(&self, id: i64, version: i64) -> Result<()> {
        let rows_affected = self
            .conn
            .execute(
                "DELETE FROM schedule_events WHERE id = ? AND version = ?",
                params![id, version],
            )
            .context("Failed to delete schedule event")?;

        if rows_affected == 0 {
            return Err(self.missed_write(id, version)?.into());
        }

        Ok(())
    }

    /// Explains why a version-checked write touched no rows.
    fn missed_write(&self, id: i64, expected: i64) -> Result<StoreError> {
        let exists = self
            .conn
            .query_row("SELECT 1 FROM schedule_events WHERE id = ?", [id], |_| Ok(()))
            .optional()
            .context("Failed to check event existence")?
            .is_some();

        Ok(if exists {
            StoreError::VersionConflict { id, expected }
        } else {
            StoreError::NotFound(id)
        })
    }
}
