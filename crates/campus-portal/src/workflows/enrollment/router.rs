use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::domain::CatalogFilter;
use super::repository::{CourseRepository, EnrollmentRepository};
use super::service::{EnrollmentError, EnrollmentService};
use crate::workflows::attendance::CourseId;
use crate::workflows::identity::Identity;
use crate::workflows::notifications::NotificationPublisher;

/// Routes for the course catalog and self-service enrollment.
pub fn enrollment_router<C, E, N>(service: Arc<EnrollmentService<C, E, N>>) -> Router
where
    C: CourseRepository + 'static,
    E: EnrollmentRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/courses", get(catalog_handler::<C, E, N>))
        .route(
            "/api/v1/courses/:course_id/enroll",
            post(enroll_handler::<C, E, N>),
        )
        .with_state(service)
}

fn unauthenticated() -> Response {
    let payload = json!({
        "error": "You must be logged in.",
    });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

pub(crate) async fn catalog_handler<C, E, N>(
    State(service): State<Arc<EnrollmentService<C, E, N>>>,
    headers: HeaderMap,
    Query(filter): Query<CatalogFilter>,
) -> Response
where
    C: CourseRepository + 'static,
    E: EnrollmentRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let Some(identity) = Identity::from_headers(&headers) else {
        return unauthenticated();
    };

    match service.catalog(&identity.subject, &filter) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(err) => {
            let payload = json!({
                "error": err.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn enroll_handler<C, E, N>(
    State(service): State<Arc<EnrollmentService<C, E, N>>>,
    headers: HeaderMap,
    Path(course_id): Path<String>,
) -> Response
where
    C: CourseRepository + 'static,
    E: EnrollmentRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let Some(identity) = Identity::from_headers(&headers) else {
        return unauthenticated();
    };

    match service.enroll(&identity.subject, &CourseId(course_id)) {
        Ok(enrollment) => (StatusCode::CREATED, axum::Json(enrollment)).into_response(),
        Err(err) => {
            let status = match &err {
                EnrollmentError::CourseNotFound(_) => StatusCode::NOT_FOUND,
                EnrollmentError::AlreadyEnrolled => StatusCode::CONFLICT,
                EnrollmentError::CourseFull { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                EnrollmentError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let payload = json!({
                "error": err.to_string(),
            });
            (status, axum::Json(payload)).into_response()
        }
    }
}
