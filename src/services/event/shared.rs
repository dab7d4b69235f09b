use chrono::{DateTime, Local, SecondsFormat, Utc};
use rusqlite::{self, Result, Row};

use crate::models::event::{EventKind, EventStatus, ScheduleEvent};

pub(crate) const EVENT_COLUMNS: &str = "id, kind, resource_id, patient_id, visit_count, membership_id,
        title, start_datetime, end_datetime, status, version, note, created_at";

/// Instants are stored as UTC so range comparisons on the text column hold
/// across offset changes.
pub(crate) fn to_storage(dt: DateTime<Local>) -> String {
    dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn to_local_datetime(value: String) -> Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn conversion_error(message: String) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(message.into())
}

pub(crate) fn map_event_row(row: &Row<'_>) -> Result<ScheduleEvent> {
    let kind_name: String = row.get(1)?;
    let kind = match kind_name.as_str() {
        "appointment" => EventKind::Appointment {
            patient_id: row.get(3)?,
            visit_count: row.get::<_, i64>(4)?.max(0) as u32,
            membership_id: row.get(5)?,
        },
        "block" => EventKind::Block {
            title: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        },
        other => return Err(conversion_error(format!("Unknown event kind '{}'", other))),
    };

    let status = row
        .get::<_, String>(9)?
        .parse::<EventStatus>()
        .map_err(conversion_error)?;

    let created_at = match row.get::<_, Option<String>>(12)? {
        Some(value) if !value.is_empty() => Some(to_local_datetime(value)?),
        _ => None,
    };

    Ok(ScheduleEvent {
        id: Some(row.get(0)?),
        resource_id: row.get(2)?,
        kind,
        start: to_local_datetime(row.get::<_, String>(7)?)?,
        end: to_local_datetime(row.get::<_, String>(8)?)?,
        status,
        version: row.get(10)?,
        note: row.get(11)?,
        created_at,
    })
}
