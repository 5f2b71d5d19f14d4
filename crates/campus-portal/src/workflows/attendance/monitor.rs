use std::sync::Arc;

use tracing::info;

use super::domain::CourseId;
use super::report::{low_attendance_notification, summarize, AttendanceBand, AttendanceSummary};
use super::repository::{AttendanceRepository, RosterSource};
use crate::workflows::clock::{Clock, SystemClock};
use crate::workflows::identity::{Identity, Role, SubjectId};
use crate::workflows::notifications::{NotificationError, NotificationPublisher};
use crate::workflows::store::RepositoryError;

/// Faculty view over course attendance, with low-attendance alerts.
pub struct AttendanceMonitor<R, S, N> {
    records: Arc<R>,
    roster: Arc<S>,
    notifications: Arc<N>,
    clock: Arc<dyn Clock>,
}

impl<R, S, N> AttendanceMonitor<R, S, N>
where
    R: AttendanceRepository + 'static,
    S: RosterSource + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(records: Arc<R>, roster: Arc<S>, notifications: Arc<N>) -> Self {
        Self::with_clock(records, roster, notifications, Arc::new(SystemClock))
    }

    pub fn with_clock(
        records: Arc<R>,
        roster: Arc<S>,
        notifications: Arc<N>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            records,
            roster,
            notifications,
            clock,
        }
    }

    pub fn course_summary(
        &self,
        actor: &Identity,
        course: &CourseId,
    ) -> Result<Vec<AttendanceSummary>, MonitorError> {
        ensure_staff(actor)?;
        let roster = self.roster.roster(course)?;
        let records = self.records.for_course(course)?;
        Ok(summarize(course, &roster, &records))
    }

    /// Rows in `band`, lowest rate first.
    pub fn summary_in_band(
        &self,
        actor: &Identity,
        course: &CourseId,
        band: AttendanceBand,
    ) -> Result<Vec<AttendanceSummary>, MonitorError> {
        let mut rows: Vec<_> = self
            .course_summary(actor, course)?
            .into_iter()
            .filter(|row| row.band == band)
            .collect();
        rows.sort_by_key(|row| row.rate);
        Ok(rows)
    }

    /// Send a low-attendance warning to one student, whatever their current rate.
    pub fn alert_low_attendance(
        &self,
        actor: &Identity,
        course: &CourseId,
        course_name: &str,
        subject: &SubjectId,
    ) -> Result<AttendanceSummary, MonitorError> {
        let summary = self
            .course_summary(actor, course)?
            .into_iter()
            .find(|row| &row.subject == subject)
            .ok_or(RepositoryError::NotFound)?;

        self.notifications.publish(low_attendance_notification(
            &summary,
            course_name,
            self.clock.now(),
        ))?;
        info!(
            subject = %subject.0,
            course = %course.0,
            rate = summary.rate,
            "low attendance alert sent"
        );
        Ok(summary)
    }
}

fn ensure_staff(actor: &Identity) -> Result<(), MonitorError> {
    if actor.role.is_staff() {
        Ok(())
    } else {
        Err(MonitorError::Forbidden(actor.role))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("role '{}' cannot view attendance reports", .0.label())]
    Forbidden(Role),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}
