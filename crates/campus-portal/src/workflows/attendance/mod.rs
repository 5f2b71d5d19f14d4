//! Location-verified attendance check-in.
//!
//! An attempt is accepted only when the caller is signed in, the device reported a position
//! inside the campus geofence, the current time falls inside a check-in window, and no
//! record exists yet for the day. The first failing check decides the rejection.

pub mod domain;
pub(crate) mod eligibility;
pub mod geo;
pub mod monitor;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod windows;

#[cfg(test)]
mod tests;

pub use domain::{
    AttendanceKey, AttendanceRecord, AttendanceStatus, AttendanceWindow, CampusLocation,
    CheckInAttempt, CourseId, GeoPoint, LocationFailure, LocationReading, PositionFix, RecordId,
    WindowDraft, WindowId, WindowValidationError,
};
pub use eligibility::{
    evaluate_window, meters_over, weekday_label, CheckInDecision, CheckInOutcome,
    CheckInRejection, ClockWindow, CourseSchedule, DailySchedule, EligibilityEngine,
    WindowEvaluation, WindowMatch, WindowPolicy, WindowStrategy,
};
pub use geo::distance_meters;
pub use monitor::{AttendanceMonitor, MonitorError};
pub use report::{
    attendance_rate, export_history_csv, summarize, AttendanceBand, AttendanceSummary,
    ReportError,
};
pub use repository::{AttendanceRepository, RosterSource, WindowRepository};
pub use router::{check_in_router, monitoring_router, window_router, CheckInRequest};
pub use service::{CheckInReceipt, CheckInService, CheckInServiceError};
pub use windows::{WindowError, WindowService};
