//! Schedule event service entry point.
//! SQLite-backed event storage with version-checked writes, split across
//! focused submodules.

use rusqlite::Connection;

pub mod crud;
pub mod queries;
mod shared;

/// Service for managing schedule events stored in SQLite.
pub struct EventService<'a> {
    pub(crate) conn: &'a Connection,
}

impl<'a> EventService<'a> {
    /// Create a new EventService with a database connection
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::{EventKind, EventStatus, ScheduleEvent};
    use crate::services::database::Database;
    use crate::services::resource::ResourceService;
    use crate::services::store::StoreError;
    use chrono::{DateTime, Duration, Local, TimeZone};
    use pretty_assertions::assert_eq;

    fn setup_test_db() -> Database {
        let db = Database::new(":memory:").unwrap();
        db.initialize_schema().unwrap();
        ResourceService::new(db.connection()).create("Dr. Lee").unwrap();
        ResourceService::new(db.connection()).create("Dr. Park").unwrap();
        db
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, day, hour, minute, 0).unwrap()
    }

    fn sample_event() -> ScheduleEvent {
        ScheduleEvent::appointment(1, at(10, 9, 0), at(10, 9, 30)).unwrap()
    }

    fn store_error(err: &anyhow::Error) -> Option<&StoreError> {
        err.downcast_ref::<StoreError>()
    }

    #[test]
    fn test_create_event() {
        let db = setup_test_db();
        let service = EventService::new(db.connection());

        let created = service.create(sample_event()).unwrap();
        assert!(created.id.is_some());
        assert_eq!(created.version, 1);
        assert_eq!(created.status, EventStatus::Pending);
        assert!(created.created_at.is_some());
    }

    #[test]
    fn test_create_and_get_block_round_trip() {
        let db = setup_test_db();
        let service = EventService::new(db.connection());

        let block = ScheduleEvent::block(2, "Staff meeting", at(10, 12, 0), at(10, 13, 0))
            .unwrap()
            .with_note("Room B");
        let created = service.create(block).unwrap();

        let found = service.get(created.id.unwrap()).unwrap().unwrap();
        assert_eq!(
            found.kind,
            EventKind::Block {
                title: "Staff meeting".to_string()
            }
        );
        assert_eq!(found.note, Some("Room B".to_string()));
        assert_eq!(found.start, at(10, 12, 0));
        assert_eq!(found.end, at(10, 13, 0));
        assert_eq!(found.resource_id, 2);
    }

    #[test]
    fn test_create_appointment_with_patient() {
        let db = setup_test_db();
        let service = EventService::new(db.connection());

        let created = service.create(sample_event().with_patient(77)).unwrap();
        let found = service.get(created.id.unwrap()).unwrap().unwrap();
        assert!(matches!(
            found.kind,
            EventKind::Appointment {
                patient_id: Some(77),
                ..
            }
        ));
    }

    #[test]
    fn test_create_invalid_event_is_rejected() {
        let db = setup_test_db();
        let service = EventService::new(db.connection());

        let mut event = sample_event();
        event.end = event.start;
        let err = service.create(event).unwrap_err();
        assert!(matches!(store_error(&err), Some(StoreError::Invalid(_))));
    }

    #[test]
    fn test_get_nonexistent_event() {
        let db = setup_test_db();
        let service = EventService::new(db.connection());

        assert!(service.get(999).unwrap().is_none());
    }

    #[test]
    fn test_update_advances_version() {
        let db = setup_test_db();
        let service = EventService::new(db.connection());

        let mut event = service.create(sample_event()).unwrap();
        event.start = at(10, 10, 0);
        event.end = at(10, 10, 30);
        event.resource_id = 2;

        let updated = service.update(&event).unwrap();
        assert_eq!(updated.version, 2);

        let stored = service.get(event.id.unwrap()).unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.resource_id, 2);
        assert_eq!(stored.start, at(10, 10, 0));
    }

    #[test]
    fn test_stale_update_is_a_conflict() {
        let db = setup_test_db();
        let service = EventService::new(db.connection());

        let original = service.create(sample_event()).unwrap();

        let mut first = original.clone();
        first.note = Some("first writer".to_string());
        service.update(&first).unwrap();

        let mut second = original.clone();
        second.note = Some("second writer".to_string());
        let err = service.update(&second).unwrap_err();
        assert_eq!(
            store_error(&err),
            Some(&StoreError::VersionConflict {
                id: original.id.unwrap(),
                expected: 1
            })
        );

        // The losing write left nothing behind
        let stored = service.get(original.id.unwrap()).unwrap().unwrap();
        assert_eq!(stored.note, Some("first writer".to_string()));
        assert_eq!(stored.version, 2);
    }

    #[test]
    fn test_update_nonexistent_event() {
        let db = setup_test_db();
        let service = EventService::new(db.connection());

        let mut event = sample_event();
        event.id = Some(999);
        let err = service.update(&event).unwrap_err();
        assert_eq!(store_error(&err), Some(&StoreError::NotFound(999)));
    }

    #[test]
    fn test_delete_requires_current_version() {
        let db = setup_test_db();
        let service = EventService::new(db.connection());

        let created = service.create(sample_event()).unwrap();
        let id = created.id.unwrap();

        let err = service.delete(id, 0).unwrap_err();
        assert!(matches!(
            store_error(&err),
            Some(StoreError::VersionConflict { .. })
        ));

        service.delete(id, created.version).unwrap();
        assert!(service.get(id).unwrap().is_none());
    }

    #[test]
    fn test_delete_nonexistent_event() {
        let db = setup_test_db();
        let service = EventService::new(db.connection());

        let err = service.delete(999, 1).unwrap_err();
        assert_eq!(store_error(&err), Some(&StoreError::NotFound(999)));
    }

    #[test]
    fn test_batch_status_only_touches_pending() {
        let db = setup_test_db();
        let service = EventService::new(db.connection());

        let a = service.create(sample_event()).unwrap();
        let mut b = service
            .create(ScheduleEvent::appointment(1, at(10, 10, 0), at(10, 10, 30)).unwrap())
            .unwrap();
        b.status = EventStatus::Cancelled;
        let b = service.update(&b).unwrap();

        let ids = [a.id.unwrap(), b.id.unwrap()];
        let changed = service
            .update_status_batch(&ids, EventStatus::Pending, EventStatus::Completed)
            .unwrap();
        assert_eq!(changed, 1);

        // Running it again is a no-op
        let changed = service
            .update_status_batch(&ids, EventStatus::Pending, EventStatus::Completed)
            .unwrap();
        assert_eq!(changed, 0);

        let a = service.get(a.id.unwrap()).unwrap().unwrap();
        let b = service.get(b.id.unwrap()).unwrap().unwrap();
        assert_eq!(a.status, EventStatus::Completed);
        assert_eq!(a.version, 2);
        assert_eq!(b.status, EventStatus::Cancelled);
    }

    #[test]
    fn test_batch_status_with_no_ids() {
        let db = setup_test_db();
        let service = EventService::new(db.connection());
        assert_eq!(
            service
                .update_status_batch(&[], EventStatus::Pending, EventStatus::Completed)
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_find_by_date_range_is_half_open() {
        let db = setup_test_db();
        let service = EventService::new(db.connection());

        service.create(sample_event()).unwrap();
        service
            .create(ScheduleEvent::appointment(1, at(12, 9, 0), at(12, 10, 0)).unwrap())
            .unwrap();
        service
            .create(ScheduleEvent::appointment(2, at(17, 9, 0), at(17, 10, 0)).unwrap())
            .unwrap();

        let week_start = at(10, 0, 0);
        let events = service
            .find_by_date_range(week_start, week_start + Duration::days(7))
            .unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].start < events[1].start);
    }

    #[test]
    fn test_list_for_resource() {
        let db = setup_test_db();
        let service = EventService::new(db.connection());

        service.create(sample_event()).unwrap();
        service
            .create(ScheduleEvent::appointment(2, at(10, 9, 0), at(10, 10, 0)).unwrap())
            .unwrap();

        let events = service
            .list_for_resource(2, at(10, 0, 0), at(11, 0, 0))
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].resource_id, 2);
    }
}
