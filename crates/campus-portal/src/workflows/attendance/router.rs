use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    CheckInAttempt, CourseId, GeoPoint, LocationFailure, LocationReading, PositionFix,
    WindowDraft, WindowId,
};
use super::eligibility::{CheckInRejection, WindowPolicy, WindowStrategy};
use super::monitor::{AttendanceMonitor, MonitorError};
use super::report::{export_history_csv, AttendanceBand};
use super::repository::{AttendanceRepository, RosterSource, WindowRepository};
use super::service::{CheckInService, CheckInServiceError};
use super::windows::{WindowError, WindowService};
use crate::workflows::identity::{Identity, SubjectId};
use crate::workflows::notifications::NotificationPublisher;
use crate::workflows::store::RepositoryError;

/// Check-in body posted by the portal after the browser geolocation call settles.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckInRequest {
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub location: Option<LocationPayload>,
    #[serde(default)]
    pub location_error: Option<LocationFailure>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LocationPayload {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy_meters: Option<f64>,
}

impl CheckInRequest {
    /// A reported error wins over coordinates; neither means the lookup is still pending.
    pub fn into_attempt(self, subject: Option<SubjectId>) -> CheckInAttempt {
        let location = match (self.location_error, self.location) {
            (Some(failure), _) => LocationReading::Unavailable(failure),
            (None, Some(payload)) => LocationReading::Resolved(PositionFix {
                point: GeoPoint::new(payload.latitude, payload.longitude),
                accuracy_meters: payload.accuracy_meters,
            }),
            (None, None) => LocationReading::Unavailable(LocationFailure::Pending),
        };

        CheckInAttempt {
            subject,
            course: self
                .course_id
                .filter(|id| !id.trim().is_empty())
                .map(CourseId),
            location,
        }
    }
}

/// Routes for the student check-in flow.
pub fn check_in_router<R, W>(service: Arc<CheckInService<R, W>>) -> Router
where
    R: AttendanceRepository + 'static,
    W: WindowRepository + 'static,
{
    Router::new()
        .route("/api/v1/attendance/campus", get(campus_handler::<R, W>))
        .route(
            "/api/v1/attendance/check-in",
            post(check_in_handler::<R, W>),
        )
        .route("/api/v1/attendance/history", get(history_handler::<R, W>))
        .route(
            "/api/v1/attendance/history.csv",
            get(history_csv_handler::<R, W>),
        )
        .with_state(service)
}

/// Routes for faculty-managed attendance windows.
pub fn window_router<W>(service: Arc<WindowService<W>>) -> Router
where
    W: WindowRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/attendance/courses/:course_id/windows",
            get(list_windows_handler::<W>).post(create_window_handler::<W>),
        )
        .route(
            "/api/v1/attendance/windows/:window_id",
            put(update_window_handler::<W>).delete(delete_window_handler::<W>),
        )
        .with_state(service)
}

/// Routes for the faculty monitoring view.
pub fn monitoring_router<R, S, N>(monitor: Arc<AttendanceMonitor<R, S, N>>) -> Router
where
    R: AttendanceRepository + 'static,
    S: RosterSource + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/attendance/courses/:course_id/summary",
            get(summary_handler::<R, S, N>),
        )
        .route(
            "/api/v1/attendance/courses/:course_id/alerts/:subject_id",
            post(alert_handler::<R, S, N>),
        )
        .with_state(monitor)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({
        "error": message.into(),
    });
    (status, axum::Json(payload)).into_response()
}

fn unauthenticated() -> Response {
    let rejection = CheckInRejection::Unauthenticated;
    let payload = json!({
        "code": rejection.code(),
        "error": rejection.to_string(),
    });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

pub(crate) async fn campus_handler<R, W>(
    State(service): State<Arc<CheckInService<R, W>>>,
) -> Response
where
    R: AttendanceRepository + 'static,
    W: WindowRepository + 'static,
{
    let mut payload = json!({
        "campus": service.campus(),
        "geolocation": service.geolocation(),
        "strategy": service.strategy(),
    });
    // course windows are listed per course under the window routes
    if service.strategy() == WindowStrategy::Fixed {
        payload["windows"] = json!(service.schedule().windows());
        payload["available"] = json!(service.schedule().describe());
    }
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn check_in_handler<R, W>(
    State(service): State<Arc<CheckInService<R, W>>>,
    headers: HeaderMap,
    request: Result<axum::Json<CheckInRequest>, JsonRejection>,
) -> Response
where
    R: AttendanceRepository + 'static,
    W: WindowRepository + 'static,
{
    let Some(identity) = Identity::from_headers(&headers) else {
        return unauthenticated();
    };
    let request = match request {
        Ok(axum::Json(request)) => request,
        Err(rejection) => return error_response(rejection.status(), rejection.body_text()),
    };
    let attempt = request.into_attempt(Some(identity.subject));

    match service.check_in(attempt) {
        Ok(receipt) => {
            let payload = json!({
                "message": receipt.decision.summary(),
                "status": receipt.record.status,
                "distance_meters": receipt.decision.distance_meters,
                "record": receipt.record,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(CheckInServiceError::Rejected(rejection)) => {
            let status = match rejection {
                CheckInRejection::Unauthenticated => StatusCode::UNAUTHORIZED,
                CheckInRejection::AlreadyCheckedIn => StatusCode::CONFLICT,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            let mut payload = serde_json::to_value(&rejection).unwrap_or_else(|_| json!({}));
            payload["code"] = json!(rejection.code());
            payload["error"] = json!(rejection.to_string());
            (status, axum::Json(payload)).into_response()
        }
        Err(err @ CheckInServiceError::PersistenceFailed(_)) => {
            let payload = json!({
                "code": err.code(),
                "error": err.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn history_handler<R, W>(
    State(service): State<Arc<CheckInService<R, W>>>,
    headers: HeaderMap,
) -> Response
where
    R: AttendanceRepository + 'static,
    W: WindowRepository + 'static,
{
    let Some(identity) = Identity::from_headers(&headers) else {
        return unauthenticated();
    };

    match service.history(&identity.subject) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

pub(crate) async fn history_csv_handler<R, W>(
    State(service): State<Arc<CheckInService<R, W>>>,
    headers: HeaderMap,
) -> Response
where
    R: AttendanceRepository + 'static,
    W: WindowRepository + 'static,
{
    let Some(identity) = Identity::from_headers(&headers) else {
        return unauthenticated();
    };

    let records = match service.history(&identity.subject) {
        Ok(records) => records,
        Err(err) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };

    let mut buffer = Vec::new();
    if let Err(err) = export_history_csv(&records, &mut buffer) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        buffer,
    )
        .into_response()
}

fn window_error_response(err: WindowError) -> Response {
    let status = match &err {
        WindowError::Forbidden(_) => StatusCode::FORBIDDEN,
        WindowError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WindowError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        WindowError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        WindowError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err.to_string())
}

pub(crate) async fn list_windows_handler<W>(
    State(service): State<Arc<WindowService<W>>>,
    Path(course_id): Path<String>,
) -> Response
where
    W: WindowRepository + 'static,
{
    match service.list(&CourseId(course_id)) {
        Ok(windows) => (StatusCode::OK, axum::Json(windows)).into_response(),
        Err(err) => window_error_response(err),
    }
}

pub(crate) async fn create_window_handler<W>(
    State(service): State<Arc<WindowService<W>>>,
    headers: HeaderMap,
    Path(course_id): Path<String>,
    axum::Json(draft): axum::Json<WindowDraft>,
) -> Response
where
    W: WindowRepository + 'static,
{
    let Some(actor) = Identity::from_headers(&headers) else {
        return unauthenticated();
    };

    match service.create(&actor, CourseId(course_id), draft) {
        Ok(window) => (StatusCode::CREATED, axum::Json(window)).into_response(),
        Err(err) => window_error_response(err),
    }
}

pub(crate) async fn update_window_handler<W>(
    State(service): State<Arc<WindowService<W>>>,
    headers: HeaderMap,
    Path(window_id): Path<String>,
    axum::Json(draft): axum::Json<WindowDraft>,
) -> Response
where
    W: WindowRepository + 'static,
{
    let Some(actor) = Identity::from_headers(&headers) else {
        return unauthenticated();
    };

    match service.update(&actor, &WindowId(window_id), draft) {
        Ok(window) => (StatusCode::OK, axum::Json(window)).into_response(),
        Err(err) => window_error_response(err),
    }
}

pub(crate) async fn delete_window_handler<W>(
    State(service): State<Arc<WindowService<W>>>,
    headers: HeaderMap,
    Path(window_id): Path<String>,
) -> Response
where
    W: WindowRepository + 'static,
{
    let Some(actor) = Identity::from_headers(&headers) else {
        return unauthenticated();
    };

    match service.delete(&actor, &WindowId(window_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => window_error_response(err),
    }
}

fn monitor_error_response(err: MonitorError) -> Response {
    let status = match &err {
        MonitorError::Forbidden(_) => StatusCode::FORBIDDEN,
        MonitorError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

/// Optional `?band=low|medium|high` filter on the course summary.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    #[serde(default)]
    pub band: Option<AttendanceBand>,
}

pub(crate) async fn summary_handler<R, S, N>(
    State(monitor): State<Arc<AttendanceMonitor<R, S, N>>>,
    headers: HeaderMap,
    Path(course_id): Path<String>,
    Query(query): Query<SummaryQuery>,
) -> Response
where
    R: AttendanceRepository + 'static,
    S: RosterSource + 'static,
    N: NotificationPublisher + 'static,
{
    let Some(actor) = Identity::from_headers(&headers) else {
        return unauthenticated();
    };

    let course = CourseId(course_id);
    let rows = match query.band {
        Some(band) => monitor.summary_in_band(&actor, &course, band),
        None => monitor.course_summary(&actor, &course),
    };
    match rows {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(err) => monitor_error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertRequest {
    #[serde(default)]
    pub course_name: Option<String>,
}

pub(crate) async fn alert_handler<R, S, N>(
    State(monitor): State<Arc<AttendanceMonitor<R, S, N>>>,
    headers: HeaderMap,
    Path((course_id, subject_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<AlertRequest>,
) -> Response
where
    R: AttendanceRepository + 'static,
    S: RosterSource + 'static,
    N: NotificationPublisher + 'static,
{
    let Some(actor) = Identity::from_headers(&headers) else {
        return unauthenticated();
    };

    let course_name = request.course_name.unwrap_or_else(|| course_id.clone());
    match monitor.alert_low_attendance(
        &actor,
        &CourseId(course_id),
        &course_name,
        &SubjectId(subject_id),
    ) {
        Ok(summary) => (StatusCode::ACCEPTED, axum::Json(summary)).into_response(),
        Err(err) => monitor_error_response(err),
    }
}
