use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::workflows::attendance::CourseId;
use crate::workflows::identity::SubjectId;

/// Catalog entry offered for enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub code: String,
    pub name: String,
    pub semester: String,
    pub professor: String,
    pub credits: u8,
    pub department: String,
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub subject: SubjectId,
    pub course: CourseId,
    pub enrolled_at: NaiveDateTime,
}

/// Catalog query. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub credits: Option<u8>,
    #[serde(default)]
    pub semester: Option<String>,
}

impl CatalogFilter {
    /// Search is a case-insensitive substring over name, code, and department; the other
    /// fields compare exactly.
    pub fn matches(&self, course: &Course) -> bool {
        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase);
        if let Some(term) = search {
            let hit = [&course.name, &course.code, &course.department]
                .iter()
                .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }

        if let Some(department) = non_empty(&self.department) {
            if course.department != department {
                return false;
            }
        }
        if let Some(semester) = non_empty(&self.semester) {
            if course.semester != semester {
                return false;
            }
        }
        self.credits.map_or(true, |credits| course.credits == credits)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Catalog row as returned to students, with remaining seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub course: Course,
    pub enrolled: usize,
    pub seats_remaining: usize,
}
