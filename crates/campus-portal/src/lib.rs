//! Student information portal services.
//!
//! The attendance workflow owns the check-in eligibility engine (geofence, clock windows,
//! duplicate detection) and the storage seams around it. Enrollment covers the course
//! catalog and capacity-checked enrollment. Both expose axum routers that the API service
//! mounts.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
