// Test fixtures - reusable test data
// A fixed clinic week, seeded databases and grid positions

#![allow(dead_code)]

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use clinic_scheduler::interaction::TimeGrid;
use clinic_scheduler::models::event::ScheduleEvent;
use clinic_scheduler::services::database::Database;
use clinic_scheduler::services::event::EventService;
use clinic_scheduler::services::resource::ResourceService;
use tempfile::TempDir;

pub const FACILITY: &str = "clinic-1";

/// Monday 10 March 2025
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

pub fn at(d: u32, hour: u32, minute: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 3, d, hour, minute, 0).unwrap()
}

/// Vertical offset of `minutes` since midnight in the default grid.
pub fn offset(minutes: i64) -> f32 {
    TimeGrid::default().minutes_to_position(minutes)
}

/// On-disk database with two resources: 1 "Dr. Lee" and 2 "Dr. Park".
pub struct TestClinic {
    pub dir: TempDir,
    pub db: Database,
}

impl TestClinic {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schedule.db");
        let db = Database::new(path.to_str().unwrap()).unwrap();
        db.initialize_schema().unwrap();

        let resources = ResourceService::new(db.connection());
        resources.create("Dr. Lee").unwrap();
        resources.create("Dr. Park").unwrap();

        Self { dir, db }
    }

    pub fn appointment(
        &self,
        resource_id: i64,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> ScheduleEvent {
        EventService::new(self.db.connection())
            .create(ScheduleEvent::appointment(resource_id, start, end).unwrap())
            .unwrap()
    }

    pub fn stored(&self, id: i64) -> ScheduleEvent {
        EventService::new(self.db.connection())
            .get(id)
            .unwrap()
            .unwrap()
    }
}
