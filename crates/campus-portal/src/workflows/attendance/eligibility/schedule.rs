use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use super::super::domain::{clock_time, AttendanceStatus, AttendanceWindow};

/// Literal wall-clock time; callers only pass in-range constants.
fn clock(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

/// Windows compare at minute resolution: 09:15:40 is still inside a window closing at 09:15.
fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

pub fn weekday_label(day_of_week: u8) -> &'static str {
    match day_of_week {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        _ => "Unknown",
    }
}

/// Window an accepted check-in fell into, with the status it earns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowMatch {
    pub label: String,
    pub status: AttendanceStatus,
}

/// Strategy deciding whether "now" is inside a check-in window and whether it is late.
pub trait WindowPolicy {
    fn classify(&self, now: NaiveDateTime) -> Option<WindowMatch>;

    /// Human readable list of the windows, used in rejection messages.
    fn describe(&self) -> String;
}

impl<T: WindowPolicy + ?Sized> WindowPolicy for &T {
    fn classify(&self, now: NaiveDateTime) -> Option<WindowMatch> {
        (**self).classify(now)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Daily clock window with its nominal on-time boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockWindow {
    pub label: String,
    #[serde(with = "clock_time")]
    pub opens: NaiveTime,
    #[serde(with = "clock_time")]
    pub on_time_until: NaiveTime,
    #[serde(with = "clock_time")]
    pub closes: NaiveTime,
}

impl ClockWindow {
    pub fn new(
        label: impl Into<String>,
        opens: NaiveTime,
        on_time_until: NaiveTime,
        closes: NaiveTime,
    ) -> Self {
        Self {
            label: label.into(),
            opens,
            on_time_until,
            closes,
        }
    }

    /// `Some(status)` when `time` is inside `[opens, closes]`; late strictly after the boundary.
    pub fn classify(&self, time: NaiveTime) -> Option<AttendanceStatus> {
        let minute = minute_of_day(time);
        if minute < minute_of_day(self.opens) || minute > minute_of_day(self.closes) {
            return None;
        }

        if minute > minute_of_day(self.on_time_until) {
            Some(AttendanceStatus::Late)
        } else {
            Some(AttendanceStatus::Present)
        }
    }

    fn describe(&self) -> String {
        format!(
            "{}-{} (late after {})",
            self.opens.format("%H:%M"),
            self.closes.format("%H:%M"),
            self.on_time_until.format("%H:%M")
        )
    }
}

/// Campus-wide windows applied every day of the week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySchedule {
    windows: Vec<ClockWindow>,
}

impl DailySchedule {
    pub fn new(windows: Vec<ClockWindow>) -> Self {
        Self { windows }
    }

    /// Morning 08:45-09:15 (late after 09:00) and afternoon 13:45-14:15 (late after 14:00).
    pub fn reference() -> Self {
        Self::new(vec![
            ClockWindow::new("morning", clock(8, 45), clock(9, 0), clock(9, 15)),
            ClockWindow::new("afternoon", clock(13, 45), clock(14, 0), clock(14, 15)),
        ])
    }

    pub fn windows(&self) -> &[ClockWindow] {
        &self.windows
    }
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self::reference()
    }
}

impl WindowPolicy for DailySchedule {
    fn classify(&self, now: NaiveDateTime) -> Option<WindowMatch> {
        self.windows.iter().find_map(|window| {
            window.classify(now.time()).map(|status| WindowMatch {
                label: window.label.clone(),
                status,
            })
        })
    }

    fn describe(&self) -> String {
        if self.windows.is_empty() {
            return "no clock-in windows configured".to_string();
        }
        self.windows
            .iter()
            .map(ClockWindow::describe)
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

/// Position of a moment relative to one faculty-configured window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowEvaluation {
    pub in_window: bool,
    pub in_grace: bool,
    pub is_late: bool,
}

/// Evaluate `now` against a weekday window with a grace period.
///
/// On time up to `start_time + grace_period_minutes`, late afterwards until `end_time`.
pub fn evaluate_window(window: &AttendanceWindow, now: NaiveDateTime) -> WindowEvaluation {
    let minute = minute_of_day(now.time());
    let start = minute_of_day(window.start_time);
    let end = minute_of_day(window.end_time);
    let today = now.weekday().num_days_from_sunday();

    let in_window =
        today == u32::from(window.day_of_week) && start <= minute && minute <= end;
    let grace_end = start.saturating_add(window.grace_period_minutes);

    WindowEvaluation {
        in_window,
        in_grace: in_window && minute <= grace_end,
        is_late: in_window && minute > grace_end,
    }
}

/// Faculty windows for a single course, consulted in weekday/start order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CourseSchedule {
    windows: Vec<AttendanceWindow>,
}

impl CourseSchedule {
    pub fn new(mut windows: Vec<AttendanceWindow>) -> Self {
        windows.sort_by_key(|window| (window.day_of_week, window.start_time));
        Self { windows }
    }

    pub fn windows(&self) -> &[AttendanceWindow] {
        &self.windows
    }

    fn label(window: &AttendanceWindow) -> String {
        format!(
            "{} {}-{}",
            weekday_label(window.day_of_week),
            window.start_time.format("%H:%M"),
            window.end_time.format("%H:%M")
        )
    }
}

impl WindowPolicy for CourseSchedule {
    fn classify(&self, now: NaiveDateTime) -> Option<WindowMatch> {
        self.windows.iter().find_map(|window| {
            let evaluation = evaluate_window(window, now);
            if !evaluation.in_window {
                return None;
            }
            let status = if evaluation.is_late {
                AttendanceStatus::Late
            } else {
                AttendanceStatus::Present
            };
            Some(WindowMatch {
                label: Self::label(window),
                status,
            })
        })
    }

    fn describe(&self) -> String {
        if self.windows.is_empty() {
            return "no attendance windows configured for this course".to_string();
        }
        self.windows
            .iter()
            .map(|window| {
                format!(
                    "{} (grace {} min)",
                    Self::label(window),
                    window.grace_period_minutes
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
