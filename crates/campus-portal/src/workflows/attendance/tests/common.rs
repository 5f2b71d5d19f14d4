use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use crate::config::AttendanceConfig;
use crate::workflows::attendance::domain::{
    AttendanceKey, AttendanceRecord, AttendanceStatus, AttendanceWindow, CampusLocation,
    CheckInAttempt, CourseId, GeoPoint, LocationReading, RecordId, WindowId,
};
use crate::workflows::attendance::repository::{
    AttendanceRepository, RosterSource, WindowRepository,
};
use crate::workflows::attendance::{CheckInService, WindowStrategy};
use crate::workflows::clock::FixedClock;
use crate::workflows::identity::SubjectId;
use crate::workflows::notifications::{Notification, NotificationError, NotificationPublisher};
use crate::workflows::store::RepositoryError;

/// Monday.
pub(super) fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).expect("valid date")
}

pub(super) fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

pub(super) fn at(hour: u32, minute: u32) -> NaiveDateTime {
    day().and_time(time(hour, minute))
}

pub(super) fn campus() -> CampusLocation {
    CampusLocation::reference()
}

/// Point `meters` due north of the campus centre (one degree of latitude is ~111.2 km).
pub(super) fn north_of_campus(meters: f64) -> GeoPoint {
    let center = campus().center;
    GeoPoint::new(center.latitude + meters / 111_194.93, center.longitude)
}

pub(super) fn student() -> SubjectId {
    SubjectId("stu-1001".to_string())
}

pub(super) fn attempt_at(point: GeoPoint) -> CheckInAttempt {
    CheckInAttempt {
        subject: Some(student()),
        course: None,
        location: LocationReading::at(point.latitude, point.longitude),
    }
}

pub(super) fn on_campus() -> CheckInAttempt {
    attempt_at(campus().center)
}

pub(super) fn course() -> CourseId {
    CourseId("CS101".to_string())
}

pub(super) fn window(
    id: &str,
    day_of_week: u8,
    start: NaiveTime,
    end: NaiveTime,
    grace: u32,
) -> AttendanceWindow {
    AttendanceWindow {
        id: WindowId(id.to_string()),
        course: course(),
        day_of_week,
        start_time: start,
        end_time: end,
        grace_period_minutes: grace,
    }
}

pub(super) fn record(
    subject: &str,
    course_id: Option<&str>,
    recorded_at: NaiveDateTime,
    status: AttendanceStatus,
) -> AttendanceRecord {
    AttendanceRecord {
        id: RecordId(format!("seed-{subject}-{recorded_at}")),
        subject: SubjectId(subject.to_string()),
        course: course_id.map(|id| CourseId(id.to_string())),
        date: recorded_at.date(),
        recorded_at,
        location: campus().center,
        accuracy_meters: Some(12.0),
        status,
        window: "morning".to_string(),
    }
}

pub(super) fn attendance_config(strategy: WindowStrategy) -> AttendanceConfig {
    AttendanceConfig {
        strategy,
        ..AttendanceConfig::default()
    }
}

pub(super) fn build_service(
    now: NaiveDateTime,
) -> (
    CheckInService<MemoryAttendance, MemoryWindows>,
    Arc<MemoryAttendance>,
    Arc<MemoryWindows>,
) {
    build_service_with(now, WindowStrategy::Fixed)
}

pub(super) fn build_service_with(
    now: NaiveDateTime,
    strategy: WindowStrategy,
) -> (
    CheckInService<MemoryAttendance, MemoryWindows>,
    Arc<MemoryAttendance>,
    Arc<MemoryWindows>,
) {
    let records = Arc::new(MemoryAttendance::default());
    let windows = Arc::new(MemoryWindows::default());
    let service = CheckInService::with_clock(
        records.clone(),
        windows.clone(),
        &attendance_config(strategy),
        Arc::new(FixedClock(now)),
    );
    (service, records, windows)
}

#[derive(Default, Clone)]
pub(super) struct MemoryAttendance {
    records: Arc<Mutex<HashMap<AttendanceKey, AttendanceRecord>>>,
}

impl MemoryAttendance {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("attendance mutex poisoned").len()
    }

    pub(super) fn seed(&self, record: AttendanceRecord) {
        self.records
            .lock()
            .expect("attendance mutex poisoned")
            .insert(record.key(), record);
    }
}

impl AttendanceRepository for MemoryAttendance {
    fn append(&self, record: AttendanceRecord) -> Result<AttendanceRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("attendance mutex poisoned");
        let key = record.key();
        if guard.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(key, record.clone());
        Ok(record)
    }

    fn exists(&self, key: &AttendanceKey) -> Result<bool, RepositoryError> {
        let guard = self.records.lock().expect("attendance mutex poisoned");
        Ok(guard.contains_key(key))
    }

    fn for_subject(&self, subject: &SubjectId) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let guard = self.records.lock().expect("attendance mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| &record.subject == subject)
            .cloned()
            .collect())
    }

    fn for_course(&self, course: &CourseId) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let guard = self.records.lock().expect("attendance mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.course.as_ref() == Some(course))
            .cloned()
            .collect())
    }
}

/// Ledger that reports nothing on read but conflicts on every insert, like a store that
/// lost a race to a concurrent check-in.
pub(super) struct RacingAttendance;

impl AttendanceRepository for RacingAttendance {
    fn append(&self, _record: AttendanceRecord) -> Result<AttendanceRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn exists(&self, _key: &AttendanceKey) -> Result<bool, RepositoryError> {
        Ok(false)
    }

    fn for_subject(&self, _subject: &SubjectId) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn for_course(&self, _course: &CourseId) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableAttendance;

impl AttendanceRepository for UnavailableAttendance {
    fn append(&self, _record: AttendanceRecord) -> Result<AttendanceRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn exists(&self, _key: &AttendanceKey) -> Result<bool, RepositoryError> {
        Ok(false)
    }

    fn for_subject(&self, _subject: &SubjectId) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_course(&self, _course: &CourseId) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryWindows {
    windows: Arc<Mutex<HashMap<WindowId, AttendanceWindow>>>,
}

impl WindowRepository for MemoryWindows {
    fn insert(&self, window: AttendanceWindow) -> Result<AttendanceWindow, RepositoryError> {
        let mut guard = self.windows.lock().expect("window mutex poisoned");
        if guard.contains_key(&window.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(window.id.clone(), window.clone());
        Ok(window)
    }

    fn update(&self, window: AttendanceWindow) -> Result<(), RepositoryError> {
        let mut guard = self.windows.lock().expect("window mutex poisoned");
        match guard.get_mut(&window.id) {
            Some(existing) => {
                *existing = window;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete(&self, id: &WindowId) -> Result<(), RepositoryError> {
        let mut guard = self.windows.lock().expect("window mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    fn fetch(&self, id: &WindowId) -> Result<Option<AttendanceWindow>, RepositoryError> {
        let guard = self.windows.lock().expect("window mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn for_course(&self, course: &CourseId) -> Result<Vec<AttendanceWindow>, RepositoryError> {
        let guard = self.windows.lock().expect("window mutex poisoned");
        Ok(guard
            .values()
            .filter(|window| &window.course == course)
            .cloned()
            .collect())
    }
}

/// Window store whose reads fail, as when the schedule table is offline.
pub(super) struct UnavailableWindows;

impl WindowRepository for UnavailableWindows {
    fn insert(&self, _window: AttendanceWindow) -> Result<AttendanceWindow, RepositoryError> {
        Err(RepositoryError::Unavailable("schedule offline".to_string()))
    }

    fn update(&self, _window: AttendanceWindow) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("schedule offline".to_string()))
    }

    fn delete(&self, _id: &WindowId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("schedule offline".to_string()))
    }

    fn fetch(&self, _id: &WindowId) -> Result<Option<AttendanceWindow>, RepositoryError> {
        Err(RepositoryError::Unavailable("schedule offline".to_string()))
    }

    fn for_course(&self, _course: &CourseId) -> Result<Vec<AttendanceWindow>, RepositoryError> {
        Err(RepositoryError::Unavailable("schedule offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRoster {
    pub(super) students: Vec<SubjectId>,
}

impl RosterSource for MemoryRoster {
    fn roster(&self, _course: &CourseId) -> Result<Vec<SubjectId>, RepositoryError> {
        Ok(self.students.clone())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifications {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notification mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
