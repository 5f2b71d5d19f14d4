use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

pub const SUBJECT_HEADER: &str = "x-subject-id";
pub const ROLE_HEADER: &str = "x-subject-role";

/// Identifier wrapper for portal users (students, faculty, administrators).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Faculty,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Faculty => "faculty",
            Self::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "faculty" => Some(Self::Faculty),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Faculty and administrators manage windows and monitor attendance.
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Faculty | Self::Admin)
    }
}

/// Authenticated caller as asserted by the upstream identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject: SubjectId,
    pub role: Role,
}

impl Identity {
    pub fn new(subject: impl Into<String>, role: Role) -> Self {
        Self {
            subject: SubjectId(subject.into()),
            role,
        }
    }

    /// Read the identity headers forwarded by the session layer.
    ///
    /// A missing or blank subject yields `None`. A missing role defaults to student; an
    /// unrecognized role is treated as unauthenticated.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let subject = headers
            .get(SUBJECT_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())?;

        let role = match headers.get(ROLE_HEADER) {
            Some(value) => Role::parse(value.to_str().ok()?)?,
            None => Role::Student,
        };

        Some(Self::new(subject, role))
    }
}
