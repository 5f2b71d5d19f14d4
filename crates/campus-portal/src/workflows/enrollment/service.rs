use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{CatalogEntry, CatalogFilter, Course, Enrollment};
use super::repository::{CourseRepository, EnrollmentRepository};
use crate::workflows::attendance::CourseId;
use crate::workflows::clock::{Clock, SystemClock};
use crate::workflows::identity::SubjectId;
use crate::workflows::notifications::{Notification, NotificationKind, NotificationPublisher};
use crate::workflows::store::RepositoryError;

pub const ENROLLMENT_TITLE: &str = "Course Enrollment Successful";

/// Service composing the course catalog, enrollment rows, and the notification sink.
pub struct EnrollmentService<C, E, N> {
    courses: Arc<C>,
    enrollments: Arc<E>,
    notifications: Arc<N>,
    clock: Arc<dyn Clock>,
}

impl<C, E, N> EnrollmentService<C, E, N>
where
    C: CourseRepository + 'static,
    E: EnrollmentRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(courses: Arc<C>, enrollments: Arc<E>, notifications: Arc<N>) -> Self {
        Self::with_clock(courses, enrollments, notifications, Arc::new(SystemClock))
    }

    pub fn with_clock(
        courses: Arc<C>,
        enrollments: Arc<E>,
        notifications: Arc<N>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            courses,
            enrollments,
            notifications,
            clock,
        }
    }

    /// Courses open to `subject`, ordered by name, excluding ones they already joined.
    pub fn catalog(
        &self,
        subject: &SubjectId,
        filter: &CatalogFilter,
    ) -> Result<Vec<CatalogEntry>, EnrollmentError> {
        let joined: HashSet<CourseId> = self
            .enrollments
            .for_subject(subject)?
            .into_iter()
            .map(|enrollment| enrollment.course)
            .collect();

        let mut courses: Vec<Course> = self
            .courses
            .all()?
            .into_iter()
            .filter(|course| !joined.contains(&course.id) && filter.matches(course))
            .collect();
        courses.sort_by(|a, b| a.name.cmp(&b.name));

        let mut counts: HashMap<CourseId, usize> = HashMap::new();
        for course in &courses {
            let enrolled = self.enrollments.for_course(&course.id)?.len();
            counts.insert(course.id.clone(), enrolled);
        }

        Ok(courses
            .into_iter()
            .map(|course| {
                let enrolled = counts.get(&course.id).copied().unwrap_or_default();
                CatalogEntry {
                    seats_remaining: (course.capacity as usize).saturating_sub(enrolled),
                    enrolled,
                    course,
                }
            })
            .collect())
    }

    /// Enroll `subject` in `course`.
    ///
    /// The capacity check and the insert are separate store calls, so two last-seat requests
    /// can both succeed unless the store enforces capacity itself.
    pub fn enroll(
        &self,
        subject: &SubjectId,
        course_id: &CourseId,
    ) -> Result<Enrollment, EnrollmentError> {
        let course = self
            .courses
            .fetch(course_id)?
            .ok_or_else(|| EnrollmentError::CourseNotFound(course_id.clone()))?;

        let roster = self.enrollments.for_course(course_id)?;
        if roster.iter().any(|enrollment| &enrollment.subject == subject) {
            return Err(EnrollmentError::AlreadyEnrolled);
        }
        if roster.len() >= course.capacity as usize {
            return Err(EnrollmentError::CourseFull {
                capacity: course.capacity,
            });
        }

        let now = self.clock.now();
        let enrollment = self
            .enrollments
            .insert(Enrollment {
                subject: subject.clone(),
                course: course.id.clone(),
                enrolled_at: now,
            })
            .map_err(|err| match err {
                RepositoryError::Conflict => EnrollmentError::AlreadyEnrolled,
                other => EnrollmentError::Repository(other),
            })?;
        info!(subject = %subject.0, course = %course.code, "enrolled");

        let notification = Notification::unread(
            subject.clone(),
            NotificationKind::Enrollment,
            ENROLLMENT_TITLE,
            format!(
                "You have successfully enrolled in {} - {}",
                course.code, course.name
            ),
            now,
        );
        if let Err(err) = self.notifications.publish(notification) {
            warn!(error = %err, subject = %subject.0, "enrollment notification not delivered");
        }

        Ok(enrollment)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error("course '{0}' does not exist")]
    CourseNotFound(CourseId),
    #[error("You are already enrolled in this course.")]
    AlreadyEnrolled,
    #[error("This course is full ({capacity} seats).")]
    CourseFull { capacity: u32 },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
