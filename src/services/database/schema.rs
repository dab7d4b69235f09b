use anyhow::{Context, Result};
use rusqlite::Connection;

use super::migrations;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    create_resources_table(conn)?;
    run_resource_migrations(conn)?;
    create_events_table(conn)?;
    run_event_migrations(conn)?;
    create_indexes(conn)?;
    Ok(())
}

fn create_resources_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            display_name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create resources table")?;

    Ok(())
}

fn run_resource_migrations(conn: &Connection) -> Result<()> {
    migrations::ensure_column(
        conn,
        "resources",
        "active",
        "ALTER TABLE resources ADD COLUMN active INTEGER NOT NULL DEFAULT 1",
    )
}

fn create_events_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schedule_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL CHECK (kind IN ('appointment', 'block')),
            resource_id INTEGER NOT NULL REFERENCES resources(id),
            patient_id INTEGER,
            visit_count INTEGER NOT NULL DEFAULT 0,
            membership_id INTEGER,
            title TEXT,
            start_datetime TEXT NOT NULL,
            end_datetime TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            version INTEGER NOT NULL DEFAULT 0,
            note TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .context("Failed to create schedule_events table")?;

    Ok(())
}

fn run_event_migrations(conn: &Connection) -> Result<()> {
    migrations::ensure_column(
        conn,
        "schedule_events",
        "patient_id",
        "ALTER TABLE schedule_events ADD COLUMN patient_id INTEGER",
    )?;

    migrations::ensure_column(
        conn,
        "schedule_events",
        "visit_count",
        "ALTER TABLE schedule_events ADD COLUMN visit_count INTEGER NOT NULL DEFAULT 0",
    )?;

    migrations::ensure_column(
        conn,
        "schedule_events",
        "membership_id",
        "ALTER TABLE schedule_events ADD COLUMN membership_id INTEGER",
    )?;

    migrations::ensure_column(
        conn,
        "schedule_events",
        "title",
        "ALTER TABLE schedule_events ADD COLUMN title TEXT",
    )?;

    migrations::ensure_column(
        conn,
        "schedule_events",
        "version",
        "ALTER TABLE schedule_events ADD COLUMN version INTEGER NOT NULL DEFAULT 0",
    )?;

    migrations::ensure_column(
        conn,
        "schedule_events",
        "note",
        "ALTER TABLE schedule_events ADD COLUMN note TEXT",
    )?;

    migrations::ensure_column(
        conn,
        "schedule_events",
        "created_at",
        "ALTER TABLE schedule_events ADD COLUMN created_at TEXT NOT NULL DEFAULT ''",
    )?;

    migrations::ensure_column(
        conn,
        "schedule_events",
        "updated_at",
        "ALTER TABLE schedule_events ADD COLUMN updated_at TEXT NOT NULL DEFAULT ''",
    )?;

    Ok(())
}

fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_schedule_events_start
         ON schedule_events(start_datetime)",
        [],
    )
    .context("Failed to create start index")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_schedule_events_status
         ON schedule_events(status, end_datetime)",
        [],
    )
    .context("Failed to create status index")?;

    Ok(())
}
