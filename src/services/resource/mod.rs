//! Resource service: the staff members that own grid columns.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::resource::Resource;

/// Service for managing schedule resources.
pub struct ResourceService<'a> {
    conn: &'a Connection,
}

impl<'a> ResourceService<'a> {
    /// Create a new ResourceService with the given database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Add a resource. Names are trimmed and must not be empty.
    pub fn create(&self, display_name: &str) -> Result<Resource> {
        let name = display_name.trim();
        if name.is_empty() {
            return Err(anyhow!("Resource name cannot be empty"));
        }

        self.conn
            .execute(
                "INSERT INTO resources (display_name, active) VALUES (?1, 1)",
                params![name],
            )
            .context("Failed to insert resource")?;

        Ok(Resource::new(self.conn.last_insert_rowid(), name))
    }

    pub fn get(&self, id: i64) -> Result<Option<Resource>> {
        self.conn
            .query_row(
                "SELECT id, display_name FROM resources WHERE id = ?1",
                params![id],
                |row| Ok(Resource::new(row.get(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .with_context(|| format!("Failed to load resource {}", id))
    }

    /// Active resources in column order.
    pub fn list_active(&self) -> Result<Vec<Resource>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, display_name FROM resources WHERE active = 1 ORDER BY id",
        )?;

        let resources = stmt
            .query_map([], |row| {
                Ok(Resource::new(row.get(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list resources")?;

        Ok(resources)
    }

    /// Hide a resource's column without touching its events.
    pub fn set_active(&self, id: i64, active: bool) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE resources SET active = ?1 WHERE id = ?2",
                params![active as i32, id],
            )
            .context("Failed to update resource")?;

        if rows == 0 {
            return Err(anyhow!("Resource with id {} not found", id));
        }
        Ok(())
    }
}
