use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    AttendanceKey, AttendanceRecord, CampusLocation, CheckInAttempt, CourseId, LocationReading,
    RecordId,
};
use super::eligibility::{
    CheckInDecision, CheckInOutcome, CheckInRejection, CourseSchedule, DailySchedule,
    EligibilityEngine, WindowMatch, WindowPolicy, WindowStrategy,
};
use super::repository::{AttendanceRepository, WindowRepository};
use crate::config::{AttendanceConfig, GeolocationOptions};
use crate::workflows::clock::{Clock, SystemClock};
use crate::workflows::identity::SubjectId;
use crate::workflows::store::RepositoryError;

/// Service composing the eligibility engine, the window source, and the attendance ledger.
pub struct CheckInService<R, W> {
    engine: Arc<EligibilityEngine>,
    schedule: Arc<DailySchedule>,
    strategy: WindowStrategy,
    geolocation: GeolocationOptions,
    records: Arc<R>,
    windows: Arc<W>,
    clock: Arc<dyn Clock>,
}

static RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_record_id() -> RecordId {
    let id = RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RecordId(format!("att-{id:06}"))
}

/// Accepted check-in: the appended record and the decision that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct CheckInReceipt {
    pub record: AttendanceRecord,
    pub decision: CheckInDecision,
}

impl<R, W> CheckInService<R, W>
where
    R: AttendanceRepository + 'static,
    W: WindowRepository + 'static,
{
    pub fn new(records: Arc<R>, windows: Arc<W>, config: &AttendanceConfig) -> Self {
        Self::with_clock(records, windows, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        records: Arc<R>,
        windows: Arc<W>,
        config: &AttendanceConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine: Arc::new(EligibilityEngine::new(config.campus.clone())),
            schedule: Arc::new(DailySchedule::reference()),
            strategy: config.strategy,
            geolocation: config.geolocation,
            records,
            windows,
            clock,
        }
    }

    /// Replace the daily schedule used by the fixed strategy.
    pub fn with_schedule(mut self, schedule: DailySchedule) -> Self {
        self.schedule = Arc::new(schedule);
        self
    }

    pub fn campus(&self) -> &CampusLocation {
        self.engine.campus()
    }

    pub fn schedule(&self) -> &DailySchedule {
        &self.schedule
    }

    pub fn strategy(&self) -> WindowStrategy {
        self.strategy
    }

    pub fn geolocation(&self) -> GeolocationOptions {
        self.geolocation
    }

    /// Evaluate an attempt at the current clock reading and append a record when accepted.
    ///
    /// Rejections never touch the ledger. A uniqueness conflict raised by the store (two
    /// near-simultaneous attempts) is reported as [`CheckInRejection::AlreadyCheckedIn`].
    pub fn check_in(
        &self,
        attempt: CheckInAttempt,
    ) -> Result<CheckInReceipt, CheckInServiceError> {
        let now = self.clock.now();

        let course = attempt.course.clone();
        let decision = self
            .engine
            .evaluate_resolving(
                &attempt,
                now,
                |requested| self.active_windows(requested),
                |subject, date| {
                    self.records.exists(&AttendanceKey {
                        subject: subject.clone(),
                        course: course.clone(),
                        date,
                    })
                },
            )
            .map_err(CheckInServiceError::PersistenceFailed)?;

        let (status, window) = match &decision.outcome {
            CheckInOutcome::Accepted { status, window } => (*status, window.clone()),
            CheckInOutcome::Rejected { rejection } => {
                debug!(
                    code = rejection.code(),
                    distance = ?decision.distance_meters,
                    "check-in rejected"
                );
                return Err(CheckInServiceError::Rejected(rejection.clone()));
            }
        };

        // accepted decisions always carry a subject and a resolved position
        let CheckInAttempt {
            subject: Some(subject),
            course,
            location: LocationReading::Resolved(fix),
        } = attempt
        else {
            return Err(CheckInServiceError::Rejected(
                CheckInRejection::Unauthenticated,
            ));
        };

        let record = AttendanceRecord {
            id: next_record_id(),
            subject,
            course,
            date: now.date(),
            recorded_at: now,
            location: fix.point,
            accuracy_meters: fix.accuracy_meters,
            status,
            window,
        };

        match self.records.append(record) {
            Ok(record) => {
                info!(
                    record = %record.id.0,
                    subject = %record.subject.0,
                    status = record.status.label(),
                    "attendance recorded"
                );
                Ok(CheckInReceipt { record, decision })
            }
            Err(RepositoryError::Conflict) => {
                debug!("duplicate check-in rejected by the store");
                Err(CheckInServiceError::Rejected(
                    CheckInRejection::AlreadyCheckedIn,
                ))
            }
            Err(err) => {
                warn!(error = %err, "failed to append attendance record");
                Err(CheckInServiceError::PersistenceFailed(err))
            }
        }
    }

    fn active_windows(
        &self,
        course: Option<&CourseId>,
    ) -> Result<ActiveWindows<'_>, RepositoryError> {
        match (self.strategy, course) {
            (WindowStrategy::Fixed, _) => Ok(ActiveWindows::Daily(self.schedule.as_ref())),
            (WindowStrategy::CourseSchedule, Some(course)) => Ok(ActiveWindows::Course(
                CourseSchedule::new(self.windows.for_course(course)?),
            )),
            (WindowStrategy::CourseSchedule, None) => {
                Ok(ActiveWindows::Course(CourseSchedule::default()))
            }
        }
    }

    /// A subject's records, newest first.
    pub fn history(&self, subject: &SubjectId) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let mut records = self.records.for_subject(subject)?;
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(records)
    }
}

/// Window policy selected by the configured strategy for one attempt.
enum ActiveWindows<'a> {
    Daily(&'a DailySchedule),
    Course(CourseSchedule),
}

impl WindowPolicy for ActiveWindows<'_> {
    fn classify(&self, now: NaiveDateTime) -> Option<WindowMatch> {
        match self {
            Self::Daily(schedule) => schedule.classify(now),
            Self::Course(schedule) => schedule.classify(now),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Daily(schedule) => schedule.describe(),
            Self::Course(schedule) => schedule.describe(),
        }
    }
}

/// Error raised by the check-in service.
#[derive(Debug, thiserror::Error)]
pub enum CheckInServiceError {
    #[error(transparent)]
    Rejected(#[from] CheckInRejection),
    #[error("An error occurred while clocking in. Please try again.")]
    PersistenceFailed(#[source] RepositoryError),
}

impl CheckInServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Rejected(rejection) => rejection.code(),
            Self::PersistenceFailed(_) => "persistence_failed",
        }
    }
}
