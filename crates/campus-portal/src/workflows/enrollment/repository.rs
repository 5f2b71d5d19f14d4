use super::domain::{Course, Enrollment};
use crate::workflows::attendance::CourseId;
use crate::workflows::identity::SubjectId;
use crate::workflows::store::RepositoryError;

/// Read-only course reference data.
pub trait CourseRepository: Send + Sync {
    fn all(&self) -> Result<Vec<Course>, RepositoryError>;
    fn fetch(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError>;
}

/// Enrollment rows. `insert` answers a repeated (subject, course) pair with
/// [`RepositoryError::Conflict`].
pub trait EnrollmentRepository: Send + Sync {
    fn insert(&self, enrollment: Enrollment) -> Result<Enrollment, RepositoryError>;
    fn for_subject(&self, subject: &SubjectId) -> Result<Vec<Enrollment>, RepositoryError>;
    fn for_course(&self, course: &CourseId) -> Result<Vec<Enrollment>, RepositoryError>;
}
