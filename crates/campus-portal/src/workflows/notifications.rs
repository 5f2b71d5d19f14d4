use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::identity::SubjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Attendance,
    Grade,
    Enrollment,
    Reminder,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Attendance => "attendance",
            Self::Grade => "grade",
            Self::Enrollment => "enrollment",
            Self::Reminder => "reminder",
        }
    }
}

/// Identifier wrapper for stored notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

/// Notification row. Clients poll for these; nothing is pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Assigned by the publisher when the row is stored; `None` until then.
    #[serde(default)]
    pub id: Option<NotificationId>,
    pub subject: SubjectId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: NaiveDateTime,
}

impl Notification {
    pub fn unread(
        subject: SubjectId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: None,
            subject,
            title: title.into(),
            message: message.into(),
            kind,
            read: false,
            created_at,
        }
    }
}

/// Outbound notification sink (a table insert in the reference deployment).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification store unavailable: {0}")]
    Transport(String),
}
