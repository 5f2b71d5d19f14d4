use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::super::domain::{
    CampusLocation, CheckInAttempt, CourseId, LocationFailure, LocationReading,
};
use super::super::geo::distance_meters;
use super::schedule::WindowPolicy;
use super::{CheckInDecision, CheckInOutcome};
use crate::workflows::identity::SubjectId;

/// Reasons a check-in is refused, in the order the checks run.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum CheckInRejection {
    #[error("You must be logged in to clock in.")]
    Unauthenticated,
    #[error("{}", .reason.message())]
    LocationUnavailable { reason: LocationFailure },
    #[error(
        "You must be within {}m of campus to clock in. You are {}m away ({}m over the limit).",
        rounded(.required_meters),
        rounded(.distance_meters),
        over_limit(.distance_meters, .required_meters)
    )]
    OutsideRadius {
        distance_meters: f64,
        required_meters: f64,
    },
    #[error("You are outside the clock-in window. Available times: {available}.")]
    OutsideWindow { available: String },
    #[error("You have already clocked in today.")]
    AlreadyCheckedIn,
}

impl CheckInRejection {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::LocationUnavailable { .. } => "location_unavailable",
            Self::OutsideRadius { .. } => "outside_radius",
            Self::OutsideWindow { .. } => "outside_window",
            Self::AlreadyCheckedIn => "already_checked_in",
        }
    }
}

/// Distance beyond the radius, rounded to the nearest meter.
pub fn meters_over(distance_meters: f64, required_meters: f64) -> i64 {
    (distance_meters - required_meters).max(0.0).round() as i64
}

fn rounded(meters: &f64) -> i64 {
    meters.round() as i64
}

fn over_limit(distance_meters: &f64, required_meters: &f64) -> i64 {
    meters_over(*distance_meters, *required_meters)
}

/// Run the ordered checks. The first failing check wins.
///
/// `resolve_windows` runs only after the identity, location and geofence checks pass;
/// `already_checked_in` only once every other check has passed.
pub(crate) fn decide<E, W, P, F>(
    attempt: &CheckInAttempt,
    campus: &CampusLocation,
    now: NaiveDateTime,
    resolve_windows: P,
    already_checked_in: F,
) -> Result<CheckInDecision, E>
where
    W: WindowPolicy,
    P: FnOnce(Option<&CourseId>) -> Result<W, E>,
    F: FnOnce(&SubjectId, NaiveDate) -> Result<bool, E>,
{
    let Some(subject) = attempt.subject.as_ref() else {
        return Ok(CheckInDecision::rejected(
            CheckInRejection::Unauthenticated,
            None,
        ));
    };

    let fix = match attempt.location {
        LocationReading::Resolved(fix) => fix,
        LocationReading::Unavailable(reason) => {
            return Ok(CheckInDecision::rejected(
                CheckInRejection::LocationUnavailable { reason },
                None,
            ));
        }
    };

    let distance = distance_meters(fix.point, campus.center);
    // NaN coordinates fail this comparison and are rejected with the radius message
    if !(distance <= campus.allowed_radius_meters) {
        return Ok(CheckInDecision::rejected(
            CheckInRejection::OutsideRadius {
                distance_meters: distance,
                required_meters: campus.allowed_radius_meters,
            },
            Some(distance),
        ));
    }

    let windows = resolve_windows(attempt.course.as_ref())?;
    let Some(window) = windows.classify(now) else {
        return Ok(CheckInDecision::rejected(
            CheckInRejection::OutsideWindow {
                available: windows.describe(),
            },
            Some(distance),
        ));
    };

    if already_checked_in(subject, now.date())? {
        return Ok(CheckInDecision::rejected(
            CheckInRejection::AlreadyCheckedIn,
            Some(distance),
        ));
    }

    Ok(CheckInDecision {
        outcome: CheckInOutcome::Accepted {
            status: window.status,
            window: window.label,
        },
        distance_meters: Some(distance),
    })
}
