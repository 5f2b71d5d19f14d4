use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::config::{
    DEFAULT_CAMPUS_LATITUDE, DEFAULT_CAMPUS_LONGITUDE, DEFAULT_CAMPUS_NAME,
    DEFAULT_CAMPUS_RADIUS_METERS,
};
use crate::workflows::identity::SubjectId;

/// Identifier wrapper for catalog courses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseId(pub String);

impl std::fmt::Display for CourseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for appended attendance records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

/// Identifier wrapper for faculty-managed attendance windows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub String);

/// Plain degree coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn distance_to(self, other: GeoPoint) -> f64 {
        super::geo::distance_meters(self, other)
    }
}

/// Fixed geofence centre and the radius a check-in must fall within.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampusLocation {
    pub name: String,
    pub center: GeoPoint,
    pub allowed_radius_meters: f64,
}

impl CampusLocation {
    /// Campus used by the reference deployment (500 m around the main gate).
    pub fn reference() -> Self {
        Self {
            name: DEFAULT_CAMPUS_NAME.to_string(),
            center: GeoPoint::new(DEFAULT_CAMPUS_LATITUDE, DEFAULT_CAMPUS_LONGITUDE),
            allowed_radius_meters: DEFAULT_CAMPUS_RADIUS_METERS,
        }
    }
}

/// Why the device could not provide a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationFailure {
    /// The request is still in flight.
    Pending,
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

impl LocationFailure {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PermissionDenied => "permission_denied",
            Self::PositionUnavailable => "position_unavailable",
            Self::Timeout => "timeout",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "permission_denied" => Some(Self::PermissionDenied),
            "position_unavailable" | "unavailable" => Some(Self::PositionUnavailable),
            "timeout" => Some(Self::Timeout),
            _ => None,
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::Pending => "Still acquiring your location. Please wait and try again.",
            Self::PermissionDenied => {
                "Unable to get your location. Please enable location permissions."
            }
            Self::PositionUnavailable => {
                "Unable to get your location. Location information is unavailable."
            }
            Self::Timeout => "Unable to get your location. Location request timed out.",
        }
    }
}

/// Device-reported position. Coordinates are trusted as reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub point: GeoPoint,
    pub accuracy_meters: Option<f64>,
}

/// Result of asking the geolocation source for a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationReading {
    Resolved(PositionFix),
    Unavailable(LocationFailure),
}

impl LocationReading {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self::Resolved(PositionFix {
            point: GeoPoint::new(latitude, longitude),
            accuracy_meters: None,
        })
    }
}

/// One subject's request to record attendance. Transient, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInAttempt {
    /// `None` when the session layer has no authenticated user.
    pub subject: Option<SubjectId>,
    /// The default flow records campus-wide attendance without a course.
    pub course: Option<CourseId>,
    pub location: LocationReading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

impl AttendanceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Present => "Present",
            Self::Late => "Late",
            Self::Absent => "Absent",
        }
    }
}

/// Uniqueness key for the one-record-per-day rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttendanceKey {
    pub subject: SubjectId,
    pub course: Option<CourseId>,
    pub date: NaiveDate,
}

/// Append-only ledger entry written by an accepted check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub subject: SubjectId,
    pub course: Option<CourseId>,
    pub date: NaiveDate,
    pub recorded_at: NaiveDateTime,
    pub location: GeoPoint,
    pub accuracy_meters: Option<f64>,
    pub status: AttendanceStatus,
    /// Label of the window the check-in matched.
    pub window: String,
}

impl AttendanceRecord {
    pub fn key(&self) -> AttendanceKey {
        AttendanceKey {
            subject: self.subject.clone(),
            course: self.course.clone(),
            date: self.date,
        }
    }
}

/// Recurring weekday interval configured by faculty for a course.
///
/// `day_of_week` counts from Sunday (0) to Saturday (6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceWindow {
    pub id: WindowId,
    pub course: CourseId,
    pub day_of_week: u8,
    #[serde(with = "clock_time")]
    pub start_time: NaiveTime,
    #[serde(with = "clock_time")]
    pub end_time: NaiveTime,
    pub grace_period_minutes: u32,
}

/// Faculty input for creating or replacing a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDraft {
    pub day_of_week: u8,
    #[serde(with = "clock_time")]
    pub start_time: NaiveTime,
    #[serde(with = "clock_time")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub grace_period_minutes: u32,
}

impl WindowDraft {
    pub fn validate(&self) -> Result<(), WindowValidationError> {
        if self.day_of_week > 6 {
            return Err(WindowValidationError::DayOutOfRange(self.day_of_week));
        }
        if self.start_time >= self.end_time {
            return Err(WindowValidationError::EmptyRange {
                start: self.start_time,
                end: self.end_time,
            });
        }
        Ok(())
    }

    pub fn into_window(self, id: WindowId, course: CourseId) -> AttendanceWindow {
        AttendanceWindow {
            id,
            course,
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            end_time: self.end_time,
            grace_period_minutes: self.grace_period_minutes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowValidationError {
    #[error("day_of_week must be between 0 (Sunday) and 6 (Saturday), found {0}")]
    DayOutOfRange(u8),
    #[error("start_time {start} must be before end_time {end}")]
    EmptyRange { start: NaiveTime, end: NaiveTime },
}

/// `HH:MM` wall-clock times; `HH:MM:SS` is accepted on input.
pub(crate) mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveTime, String> {
        let trimmed = raw.trim();
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map_err(|err| format!("failed to parse '{raw}' as HH:MM ({err})"))
    }
}
