use campus_portal::workflows::attendance::{
    AttendanceKey, AttendanceRecord, AttendanceRepository, AttendanceWindow, CourseId,
    RosterSource, WindowId, WindowRepository,
};
use campus_portal::workflows::enrollment::{
    Course, CourseRepository, Enrollment, EnrollmentRepository,
};
use campus_portal::workflows::identity::SubjectId;
use campus_portal::workflows::notifications::{
    Notification, NotificationError, NotificationId, NotificationPublisher,
};
use campus_portal::workflows::store::RepositoryError;
use chrono::NaiveDateTime;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store poisoned".to_string()))
}

/// Attendance ledger keyed by (subject, course, date) so duplicates conflict on insert.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAttendanceStore {
    records: Arc<Mutex<HashMap<AttendanceKey, AttendanceRecord>>>,
}

impl AttendanceRepository for InMemoryAttendanceStore {
    fn append(&self, record: AttendanceRecord) -> Result<AttendanceRecord, RepositoryError> {
        let mut guard = lock(&self.records)?;
        let key = record.key();
        if guard.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(key, record.clone());
        Ok(record)
    }

    fn exists(&self, key: &AttendanceKey) -> Result<bool, RepositoryError> {
        Ok(lock(&self.records)?.contains_key(key))
    }

    fn for_subject(&self, subject: &SubjectId) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        Ok(lock(&self.records)?
            .values()
            .filter(|record| &record.subject == subject)
            .cloned()
            .collect())
    }

    fn for_course(&self, course: &CourseId) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        Ok(lock(&self.records)?
            .values()
            .filter(|record| record.course.as_ref() == Some(course))
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryWindowStore {
    windows: Arc<Mutex<HashMap<WindowId, AttendanceWindow>>>,
}

impl WindowRepository for InMemoryWindowStore {
    fn insert(&self, window: AttendanceWindow) -> Result<AttendanceWindow, RepositoryError> {
        let mut guard = lock(&self.windows)?;
        if guard.contains_key(&window.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(window.id.clone(), window.clone());
        Ok(window)
    }

    fn update(&self, window: AttendanceWindow) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.windows)?;
        if guard.contains_key(&window.id) {
            guard.insert(window.id.clone(), window);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn delete(&self, id: &WindowId) -> Result<(), RepositoryError> {
        lock(&self.windows)?
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn fetch(&self, id: &WindowId) -> Result<Option<AttendanceWindow>, RepositoryError> {
        Ok(lock(&self.windows)?.get(id).cloned())
    }

    fn for_course(&self, course: &CourseId) -> Result<Vec<AttendanceWindow>, RepositoryError> {
        Ok(lock(&self.windows)?
            .values()
            .filter(|window| &window.course == course)
            .cloned()
            .collect())
    }
}

/// Course reference data seeded at startup.
#[derive(Clone)]
pub(crate) struct InMemoryCourseCatalog {
    courses: Arc<BTreeMap<CourseId, Course>>,
}

impl InMemoryCourseCatalog {
    pub(crate) fn new(courses: Vec<Course>) -> Self {
        Self {
            courses: Arc::new(
                courses
                    .into_iter()
                    .map(|course| (course.id.clone(), course))
                    .collect(),
            ),
        }
    }

    pub(crate) fn seeded() -> Self {
        Self::new(seed_courses())
    }

    pub(crate) fn name_of(&self, id: &CourseId) -> Option<String> {
        self.courses.get(id).map(|course| course.name.clone())
    }
}

impl CourseRepository for InMemoryCourseCatalog {
    fn all(&self) -> Result<Vec<Course>, RepositoryError> {
        Ok(self.courses.values().cloned().collect())
    }

    fn fetch(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError> {
        Ok(self.courses.get(id).cloned())
    }
}

/// Enrollment rows; also serves as the roster for attendance monitoring.
#[derive(Default, Clone)]
pub(crate) struct InMemoryEnrollmentStore {
    rows: Arc<Mutex<Vec<Enrollment>>>,
}

impl EnrollmentRepository for InMemoryEnrollmentStore {
    fn insert(&self, enrollment: Enrollment) -> Result<Enrollment, RepositoryError> {
        let mut guard = lock(&self.rows)?;
        if guard
            .iter()
            .any(|row| row.subject == enrollment.subject && row.course == enrollment.course)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.push(enrollment.clone());
        Ok(enrollment)
    }

    fn for_subject(&self, subject: &SubjectId) -> Result<Vec<Enrollment>, RepositoryError> {
        Ok(lock(&self.rows)?
            .iter()
            .filter(|row| &row.subject == subject)
            .cloned()
            .collect())
    }

    fn for_course(&self, course: &CourseId) -> Result<Vec<Enrollment>, RepositoryError> {
        Ok(lock(&self.rows)?
            .iter()
            .filter(|row| &row.course == course)
            .cloned()
            .collect())
    }
}

impl RosterSource for InMemoryEnrollmentStore {
    fn roster(&self, course: &CourseId) -> Result<Vec<SubjectId>, RepositoryError> {
        Ok(self
            .for_course(course)?
            .into_iter()
            .map(|enrollment| enrollment.subject)
            .collect())
    }
}

/// Outbox that stores published notifications, assigning `ntf-000001` style ids.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationOutbox {
    sent: Arc<Mutex<Vec<Notification>>>,
    sequence: Arc<AtomicU64>,
}

impl NotificationPublisher for InMemoryNotificationOutbox {
    fn publish(&self, mut notification: Notification) -> Result<(), NotificationError> {
        if notification.id.is_none() {
            let next = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
            notification.id = Some(NotificationId(format!("ntf-{next:06}")));
        }
        self.sent
            .lock()
            .map_err(|_| NotificationError::Transport("outbox poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}

impl InMemoryNotificationOutbox {
    pub(crate) fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

pub(crate) fn seed_courses() -> Vec<Course> {
    let course = |code: &str, name: &str, professor: &str, credits, department: &str, capacity| {
        Course {
            id: CourseId(code.to_string()),
            code: code.to_string(),
            name: name.to_string(),
            semester: "Fall 2025".to_string(),
            professor: professor.to_string(),
            credits,
            department: department.to_string(),
            capacity,
        }
    };

    vec![
        course("CS101", "Introduction to Programming", "Dr. Alharbi", 3, "Computer Science", 40),
        course("CS201", "Data Structures", "Dr. Alharbi", 4, "Computer Science", 35),
        course("MATH150", "Calculus I", "Dr. Alqahtani", 4, "Mathematics", 60),
        course("PHYS110", "General Physics", "Dr. Almutairi", 4, "Physics", 45),
        course("ENG102", "Academic Writing", "Dr. Alshehri", 3, "English", 30),
    ]
}

pub(crate) fn parse_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DDTHH:MM ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_portal::workflows::notifications::NotificationKind;

    #[test]
    fn parses_minute_and_second_timestamps() {
        let minute = parse_datetime("2025-03-03T08:50").expect("minute precision");
        let second = parse_datetime("2025-03-03T08:50:00").expect("second precision");
        assert_eq!(minute, second);
        assert!(parse_datetime("08:50").is_err());
    }

    #[test]
    fn outbox_assigns_ids_to_stored_notifications() {
        let outbox = InMemoryNotificationOutbox::default();
        let created_at = parse_datetime("2025-03-03T09:00").expect("valid");
        for title in ["first", "second"] {
            outbox
                .publish(Notification::unread(
                    SubjectId("stu-1".to_string()),
                    NotificationKind::Reminder,
                    title,
                    "body",
                    created_at,
                ))
                .expect("published");
        }

        let ids: Vec<_> = outbox
            .sent()
            .into_iter()
            .map(|notification| notification.id)
            .collect();
        assert_eq!(
            ids,
            vec![
                Some(NotificationId("ntf-000001".to_string())),
                Some(NotificationId("ntf-000002".to_string())),
            ]
        );
    }

    #[test]
    fn roster_lists_enrolled_subjects() {
        let store = InMemoryEnrollmentStore::default();
        let enrolled_at = parse_datetime("2025-03-01T10:00").expect("valid");
        store
            .insert(Enrollment {
                subject: SubjectId("stu-1".to_string()),
                course: CourseId("CS101".to_string()),
                enrolled_at,
            })
            .expect("inserted");

        let roster = store
            .roster(&CourseId("CS101".to_string()))
            .expect("roster");
        assert_eq!(roster, vec![SubjectId("stu-1".to_string())]);
        assert!(store
            .roster(&CourseId("MATH150".to_string()))
            .expect("roster")
            .is_empty());
    }
}
