use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

use super::domain::{AttendanceWindow, CourseId, WindowDraft, WindowId, WindowValidationError};
use super::eligibility::CourseSchedule;
use super::repository::WindowRepository;
use crate::workflows::identity::{Identity, Role};
use crate::workflows::store::RepositoryError;

/// Faculty CRUD over per-course attendance windows.
pub struct WindowService<W> {
    windows: Arc<W>,
}

static WINDOW_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_window_id() -> WindowId {
    let id = WINDOW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    WindowId(format!("win-{id:06}"))
}

impl<W> WindowService<W>
where
    W: WindowRepository + 'static,
{
    pub fn new(windows: Arc<W>) -> Self {
        Self { windows }
    }

    /// Windows for a course ordered by weekday then start time. Readable by any caller.
    pub fn list(&self, course: &CourseId) -> Result<Vec<AttendanceWindow>, WindowError> {
        Ok(self.schedule_for(course)?.windows().to_vec())
    }

    pub fn schedule_for(&self, course: &CourseId) -> Result<CourseSchedule, WindowError> {
        Ok(CourseSchedule::new(self.windows.for_course(course)?))
    }

    pub fn create(
        &self,
        actor: &Identity,
        course: CourseId,
        draft: WindowDraft,
    ) -> Result<AttendanceWindow, WindowError> {
        ensure_staff(actor)?;
        draft.validate()?;

        let window = self.windows.insert(draft.into_window(next_window_id(), course))?;
        info!(
            window = %window.id.0,
            course = %window.course.0,
            actor = %actor.subject.0,
            "attendance window created"
        );
        Ok(window)
    }

    /// Replace the schedule fields of an existing window; the owning course is kept.
    pub fn update(
        &self,
        actor: &Identity,
        id: &WindowId,
        draft: WindowDraft,
    ) -> Result<AttendanceWindow, WindowError> {
        ensure_staff(actor)?;
        draft.validate()?;

        let existing = self.windows.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        let window = draft.into_window(existing.id, existing.course);
        self.windows.update(window.clone())?;
        info!(window = %window.id.0, actor = %actor.subject.0, "attendance window updated");
        Ok(window)
    }

    pub fn delete(&self, actor: &Identity, id: &WindowId) -> Result<(), WindowError> {
        ensure_staff(actor)?;
        self.windows.delete(id)?;
        info!(window = %id.0, actor = %actor.subject.0, "attendance window deleted");
        Ok(())
    }
}

fn ensure_staff(actor: &Identity) -> Result<(), WindowError> {
    if actor.role.is_staff() {
        Ok(())
    } else {
        Err(WindowError::Forbidden(actor.role))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("role '{}' cannot manage attendance windows", .0.label())]
    Forbidden(Role),
    #[error(transparent)]
    Invalid(#[from] WindowValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
