use super::domain::{
    AttendanceKey, AttendanceRecord, AttendanceWindow, CourseId, WindowId,
};
use crate::workflows::identity::SubjectId;
use crate::workflows::store::RepositoryError;

/// Append-only attendance ledger.
///
/// `append` must enforce uniqueness of [`AttendanceKey`] and answer a second record for the
/// same key with [`RepositoryError::Conflict`]; the service relies on this rather than on
/// its own read-before-write.
pub trait AttendanceRepository: Send + Sync {
    fn append(&self, record: AttendanceRecord) -> Result<AttendanceRecord, RepositoryError>;
    fn exists(&self, key: &AttendanceKey) -> Result<bool, RepositoryError>;
    fn for_subject(&self, subject: &SubjectId) -> Result<Vec<AttendanceRecord>, RepositoryError>;
    fn for_course(&self, course: &CourseId) -> Result<Vec<AttendanceRecord>, RepositoryError>;
}

/// Faculty-managed attendance windows.
pub trait WindowRepository: Send + Sync {
    fn insert(&self, window: AttendanceWindow) -> Result<AttendanceWindow, RepositoryError>;
    fn update(&self, window: AttendanceWindow) -> Result<(), RepositoryError>;
    fn delete(&self, id: &WindowId) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &WindowId) -> Result<Option<AttendanceWindow>, RepositoryError>;
    fn for_course(&self, course: &CourseId) -> Result<Vec<AttendanceWindow>, RepositoryError>;
}

/// Read-only view of who is enrolled in a course, for monitoring reports.
pub trait RosterSource: Send + Sync {
    fn roster(&self, course: &CourseId) -> Result<Vec<SubjectId>, RepositoryError>;
}
