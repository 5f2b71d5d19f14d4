mod config;
mod policy;
mod schedule;

pub use config::WindowStrategy;
pub use policy::{meters_over, CheckInRejection};
pub use schedule::{
    evaluate_window, weekday_label, ClockWindow, CourseSchedule, DailySchedule, WindowEvaluation,
    WindowMatch, WindowPolicy,
};

use std::convert::Infallible;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::domain::{AttendanceStatus, CampusLocation, CheckInAttempt, CourseId};
use crate::workflows::identity::SubjectId;

/// Stateless evaluator applying the campus geofence and a window policy to an attempt.
#[derive(Debug, Clone)]
pub struct EligibilityEngine {
    campus: CampusLocation,
}

impl EligibilityEngine {
    pub fn new(campus: CampusLocation) -> Self {
        Self { campus }
    }

    pub fn campus(&self) -> &CampusLocation {
        &self.campus
    }

    /// Decide an attempt when the caller already knows whether today's record exists.
    pub fn evaluate(
        &self,
        attempt: &CheckInAttempt,
        windows: &dyn WindowPolicy,
        existing_record_today: bool,
        now: NaiveDateTime,
    ) -> CheckInDecision {
        let decided = policy::decide(
            attempt,
            &self.campus,
            now,
            |_| Ok::<_, Infallible>(windows),
            |_, _| Ok(existing_record_today),
        );
        match decided {
            Ok(decision) => decision,
            Err(never) => match never {},
        }
    }

    /// Decide an attempt, consulting `already_checked_in` only after every other check passed.
    pub fn evaluate_with<E, F>(
        &self,
        attempt: &CheckInAttempt,
        windows: &dyn WindowPolicy,
        now: NaiveDateTime,
        already_checked_in: F,
    ) -> Result<CheckInDecision, E>
    where
        F: FnOnce(&SubjectId, chrono::NaiveDate) -> Result<bool, E>,
    {
        policy::decide(attempt, &self.campus, now, |_| Ok(windows), already_checked_in)
    }

    /// Like [`Self::evaluate_with`], but the window policy is loaded for the attempt's course
    /// only once the identity, location and geofence checks have passed.
    pub fn evaluate_resolving<E, W, P, F>(
        &self,
        attempt: &CheckInAttempt,
        now: NaiveDateTime,
        resolve_windows: P,
        already_checked_in: F,
    ) -> Result<CheckInDecision, E>
    where
        W: WindowPolicy,
        P: FnOnce(Option<&CourseId>) -> Result<W, E>,
        F: FnOnce(&SubjectId, chrono::NaiveDate) -> Result<bool, E>,
    {
        policy::decide(
            attempt,
            &self.campus,
            now,
            resolve_windows,
            already_checked_in,
        )
    }
}

/// Accept/reject verdict for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CheckInOutcome {
    Accepted {
        status: AttendanceStatus,
        window: String,
    },
    Rejected {
        rejection: CheckInRejection,
    },
}

/// Engine output: the verdict plus the measured distance once a position was available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckInDecision {
    pub outcome: CheckInOutcome,
    pub distance_meters: Option<f64>,
}

impl CheckInDecision {
    pub(crate) fn rejected(rejection: CheckInRejection, distance_meters: Option<f64>) -> Self {
        Self {
            outcome: CheckInOutcome::Rejected { rejection },
            distance_meters,
        }
    }

    pub fn accepted(&self) -> bool {
        matches!(self.outcome, CheckInOutcome::Accepted { .. })
    }

    pub fn status(&self) -> Option<AttendanceStatus> {
        match &self.outcome {
            CheckInOutcome::Accepted { status, .. } => Some(*status),
            CheckInOutcome::Rejected { .. } => None,
        }
    }

    pub fn rejection(&self) -> Option<&CheckInRejection> {
        match &self.outcome {
            CheckInOutcome::Accepted { .. } => None,
            CheckInOutcome::Rejected { rejection } => Some(rejection),
        }
    }

    pub fn summary(&self) -> String {
        match &self.outcome {
            CheckInOutcome::Accepted { status, window } => {
                format!("Successfully clocked in! Status: {} ({window})", status.label())
            }
            CheckInOutcome::Rejected { rejection } => rejection.to_string(),
        }
    }
}
