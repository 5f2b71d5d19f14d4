use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};

use crate::workflows::attendance::CourseId;
use crate::workflows::clock::FixedClock;
use crate::workflows::enrollment::domain::{Course, Enrollment};
use crate::workflows::enrollment::repository::{CourseRepository, EnrollmentRepository};
use crate::workflows::enrollment::EnrollmentService;
use crate::workflows::identity::SubjectId;
use crate::workflows::notifications::{Notification, NotificationError, NotificationPublisher};
use crate::workflows::store::RepositoryError;

pub(super) fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 12)
        .expect("valid date")
        .and_hms_opt(10, 30, 0)
        .expect("valid time")
}

pub(super) fn course(
    id: &str,
    name: &str,
    department: &str,
    credits: u8,
    capacity: u32,
) -> Course {
    Course {
        id: CourseId(id.to_string()),
        code: id.to_string(),
        name: name.to_string(),
        semester: "Spring 2025".to_string(),
        professor: "Dr. Haddad".to_string(),
        credits,
        department: department.to_string(),
        capacity,
    }
}

pub(super) fn catalog() -> Vec<Course> {
    vec![
        course("CS101", "Introduction to Computing", "Computer Science", 3, 2),
        course("MATH201", "Linear Algebra", "Mathematics", 4, 30),
        course("CS240", "Data Structures", "Computer Science", 4, 1),
    ]
}

pub(super) fn student() -> SubjectId {
    SubjectId("stu-1001".to_string())
}

pub(super) type TestService =
    EnrollmentService<MemoryCourses, MemoryEnrollments, MemoryNotifications>;

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryEnrollments>,
    Arc<MemoryNotifications>,
) {
    let enrollments = Arc::new(MemoryEnrollments::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = EnrollmentService::with_clock(
        Arc::new(MemoryCourses { courses: catalog() }),
        enrollments.clone(),
        notifications.clone(),
        Arc::new(FixedClock(now())),
    );
    (service, enrollments, notifications)
}

pub(super) struct MemoryCourses {
    pub(super) courses: Vec<Course>,
}

impl CourseRepository for MemoryCourses {
    fn all(&self) -> Result<Vec<Course>, RepositoryError> {
        Ok(self.courses.clone())
    }

    fn fetch(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError> {
        Ok(self.courses.iter().find(|course| &course.id == id).cloned())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryEnrollments {
    rows: Arc<Mutex<Vec<Enrollment>>>,
}

impl MemoryEnrollments {
    pub(super) fn len(&self) -> usize {
        self.rows.lock().expect("enrollment mutex poisoned").len()
    }
}

impl EnrollmentRepository for MemoryEnrollments {
    fn insert(&self, enrollment: Enrollment) -> Result<Enrollment, RepositoryError> {
        let mut guard = self.rows.lock().expect("enrollment mutex poisoned");
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
        let guard = self.rows.lock().expect("enrollment mutex poisoned");
        Ok(guard
            .iter()
            .filter(|row| &row.subject == subject)
            .cloned()
            .collect())
    }

    fn for_course(&self, course: &CourseId) -> Result<Vec<Enrollment>, RepositoryError> {
        let guard = self.rows.lock().expect("enrollment mutex poisoned");
        Ok(guard
            .iter()
            .filter(|row| &row.course == course)
            .cloned()
            .collect())
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

pub(super) struct BrokenNotifications;

impl NotificationPublisher for BrokenNotifications {
    fn publish(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("mailer offline".to_string()))
    }
}
