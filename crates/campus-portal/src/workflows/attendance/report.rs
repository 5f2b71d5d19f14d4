use std::collections::BTreeMap;
use std::io::Write;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::domain::{AttendanceRecord, AttendanceStatus, CourseId};
use crate::workflows::identity::SubjectId;
use crate::workflows::notifications::{Notification, NotificationKind};

pub const LOW_ATTENDANCE_TITLE: &str = "Low Attendance Warning";

/// Attendance rate band shown next to each student on the monitoring view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceBand {
    Low,
    Medium,
    High,
}

impl AttendanceBand {
    pub const fn from_rate(rate: u32) -> Self {
        if rate >= 90 {
            Self::High
        } else if rate >= 75 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// One student's attendance in one course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub subject: SubjectId,
    pub course: CourseId,
    pub total: usize,
    pub present: usize,
    pub late: usize,
    pub absent: usize,
    pub rate: u32,
    pub band: AttendanceBand,
    pub last_attendance: Option<NaiveDateTime>,
}

/// Rounded percentage of records that count as attended (present or late).
pub fn attendance_rate(present: usize, late: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (((present + late) as f64 / total as f64) * 100.0).round() as u32
}

/// Build one row per rostered student, plus any student with records but no roster entry.
///
/// Rows are ordered by subject id.
pub fn summarize(
    course: &CourseId,
    roster: &[SubjectId],
    records: &[AttendanceRecord],
) -> Vec<AttendanceSummary> {
    let mut grouped: BTreeMap<&SubjectId, Vec<&AttendanceRecord>> =
        roster.iter().map(|subject| (subject, Vec::new())).collect();

    for record in records
        .iter()
        .filter(|record| record.course.as_ref() == Some(course))
    {
        grouped.entry(&record.subject).or_default().push(record);
    }

    grouped
        .into_iter()
        .map(|(subject, records)| {
            let count = |status: AttendanceStatus| {
                records
                    .iter()
                    .filter(|record| record.status == status)
                    .count()
            };
            let present = count(AttendanceStatus::Present);
            let late = count(AttendanceStatus::Late);
            let absent = count(AttendanceStatus::Absent);
            let total = records.len();
            let rate = attendance_rate(present, late, total);

            AttendanceSummary {
                subject: subject.clone(),
                course: course.clone(),
                total,
                present,
                late,
                absent,
                rate,
                band: AttendanceBand::from_rate(rate),
                last_attendance: records.iter().map(|record| record.recorded_at).max(),
            }
        })
        .collect()
}

pub fn low_attendance_notification(
    summary: &AttendanceSummary,
    course_name: &str,
    created_at: NaiveDateTime,
) -> Notification {
    Notification::unread(
        summary.subject.clone(),
        NotificationKind::Attendance,
        LOW_ATTENDANCE_TITLE,
        format!(
            "Your attendance in {course_name} is {}%. Please improve your attendance to avoid academic consequences.",
            summary.rate
        ),
        created_at,
    )
}

#[derive(Debug, Serialize)]
struct HistoryRow<'a> {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "Course")]
    course: &'a str,
    #[serde(rename = "Status")]
    status: &'static str,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
}

/// Write a subject's history as CSV. Campus-wide records leave the course column empty.
pub fn export_history_csv<W: Write>(
    records: &[AttendanceRecord],
    writer: W,
) -> Result<(), ReportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(HistoryRow {
            date: record.date.format("%Y-%m-%d").to_string(),
            time: record.recorded_at.format("%H:%M:%S").to_string(),
            course: record
                .course
                .as_ref()
                .map(|course| course.0.as_str())
                .unwrap_or_default(),
            status: record.status.label(),
            latitude: record.location.latitude,
            longitude: record.location.longitude,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[derive(Debug)]
pub enum ReportError {
    Csv(csv::Error),
    Io(std::io::Error),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Csv(err) => write!(f, "failed to encode attendance CSV: {}", err),
            ReportError::Io(err) => write!(f, "failed to write attendance export: {}", err),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Csv(err) => Some(err),
            ReportError::Io(err) => Some(err),
        }
    }
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
