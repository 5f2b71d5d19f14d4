use serde::{Deserialize, Serialize};

/// Which time-window mechanism gates check-in.
///
/// `Fixed` applies the daily clock schedule to every attempt. `CourseSchedule` consults the
/// faculty-managed windows of the attempt's course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStrategy {
    Fixed,
    CourseSchedule,
}

impl WindowStrategy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fixed" | "daily" => Some(Self::Fixed),
            "course" | "course_schedule" => Some(Self::CourseSchedule),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::CourseSchedule => "course_schedule",
        }
    }
}
