//! Course catalog and capacity-checked self-service enrollment.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{CatalogEntry, CatalogFilter, Course, Enrollment};
pub use repository::{CourseRepository, EnrollmentRepository};
pub use router::enrollment_router;
pub use service::{EnrollmentError, EnrollmentService};
