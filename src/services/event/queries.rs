use super::shared::{map_event_row, to_storage, EVENT_COLUMNS};
use super::EventService;
use crate::models::event::ScheduleEvent;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use rusqlite::params;

impl<'a> EventService<'a> {
    /// Events overlapping the half-open range `[start, end)`, ordered by start.
    pub fn find_by_date_range(
        &self,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Result<Vec<ScheduleEvent>> {
        let sql = format!(
            "SELECT {} FROM schedule_events
             WHERE start_datetime < ? AND end_datetime > ?
             ORDER BY start_datetime, resource_id, id",
            EVENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let events = stmt
            .query_map(params![to_storage(end), to_storage(start)], map_event_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to load events for range")?;

        Ok(events)
    }

    /// Events in one resource's column overlapping `[start, end)`.
    pub fn list_for_resource(
        &self,
        resource_id: i64,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Result<Vec<ScheduleEvent>> {
        let sql = format!(
            "SELECT {} FROM schedule_events
             WHERE resource_id = ? AND start_datetime < ? AND end_datetime > ?
             ORDER BY start_datetime, id",
            EVENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let events = stmt
            .query_map(
                params![resource_id, to_storage(end), to_storage(start)],
                map_event_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to load events for resource {}", resource_id))?;

        Ok(events)
    }
}
