use crate::infra::{
    AppState, InMemoryAttendanceStore, InMemoryCourseCatalog, InMemoryEnrollmentStore,
    InMemoryNotificationOutbox, InMemoryWindowStore,
};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use campus_portal::config::AttendanceConfig;
use campus_portal::workflows::attendance::{
    check_in_router, monitoring_router, window_router, AttendanceMonitor, CheckInService,
    WindowService,
};
use campus_portal::workflows::clock::Clock;
use campus_portal::workflows::enrollment::{enrollment_router, EnrollmentService};
use serde_json::json;
use std::sync::Arc;

pub(crate) type PortalCheckIn = CheckInService<InMemoryAttendanceStore, InMemoryWindowStore>;
pub(crate) type PortalWindows = WindowService<InMemoryWindowStore>;
pub(crate) type PortalMonitor =
    AttendanceMonitor<InMemoryAttendanceStore, InMemoryEnrollmentStore, InMemoryNotificationOutbox>;
pub(crate) type PortalEnrollment =
    EnrollmentService<InMemoryCourseCatalog, InMemoryEnrollmentStore, InMemoryNotificationOutbox>;

/// Every service the HTTP surface mounts, wired over shared in-memory stores.
pub(crate) struct PortalServices {
    pub(crate) check_in: Arc<PortalCheckIn>,
    pub(crate) windows: Arc<PortalWindows>,
    pub(crate) monitor: Arc<PortalMonitor>,
    pub(crate) enrollment: Arc<PortalEnrollment>,
    pub(crate) catalog: InMemoryCourseCatalog,
    pub(crate) outbox: Arc<InMemoryNotificationOutbox>,
}

impl PortalServices {
    pub(crate) fn in_memory(config: &AttendanceConfig, clock: Arc<dyn Clock>) -> Self {
        let records = Arc::new(InMemoryAttendanceStore::default());
        let windows = Arc::new(InMemoryWindowStore::default());
        let enrollments = Arc::new(InMemoryEnrollmentStore::default());
        let outbox = Arc::new(InMemoryNotificationOutbox::default());
        let catalog = InMemoryCourseCatalog::seeded();

        Self {
            check_in: Arc::new(CheckInService::with_clock(
                records.clone(),
                windows.clone(),
                config,
                clock.clone(),
            )),
            windows: Arc::new(WindowService::new(windows)),
            monitor: Arc::new(AttendanceMonitor::with_clock(
                records,
                enrollments.clone(),
                outbox.clone(),
                clock.clone(),
            )),
            enrollment: Arc::new(EnrollmentService::with_clock(
                Arc::new(catalog.clone()),
                enrollments,
                outbox.clone(),
                clock,
            )),
            catalog,
            outbox,
        }
    }
}

pub(crate) fn with_portal_routes(services: &PortalServices) -> axum::Router {
    check_in_router(services.check_in.clone())
        .merge(window_router(services.windows.clone()))
        .merge(monitoring_router(services.monitor.clone()))
        .merge(enrollment_router(services.enrollment.clone()))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use campus_portal::workflows::clock::FixedClock;
    use campus_portal::workflows::identity::{ROLE_HEADER, SUBJECT_HEADER};
    use chrono::NaiveDate;
    use serde_json::Value;
    use tower::ServiceExt;

    fn services() -> PortalServices {
        let now = NaiveDate::from_ymd_opt(2025, 3, 3)
            .expect("valid date")
            .and_hms_opt(8, 50, 0)
            .expect("valid time");
        PortalServices::in_memory(&AttendanceConfig::default(), Arc::new(FixedClock(now)))
    }

    async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(request)
            .await
            .expect("route executes");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        let payload = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, payload)
    }

    #[tokio::test]
    async fn health_route_reports_ok() {
        let router = with_portal_routes(&services());
        let (status, payload) = send(
            &router,
            Request::get("/health").body(Body::empty()).expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["status"], "ok");
    }

    #[tokio::test]
    async fn enrolled_student_checks_in_and_appears_in_course_summary() {
        let services = services();
        let router = with_portal_routes(&services);
        let campus = services.check_in.campus().center;

        let (status, _) = send(
            &router,
            Request::post("/api/v1/courses/CS101/enroll")
                .header(SUBJECT_HEADER, "stu-1001")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let body = json!({
            "course_id": "CS101",
            "location": { "latitude": campus.latitude, "longitude": campus.longitude }
        });
        let (status, payload) = send(
            &router,
            Request::post("/api/v1/attendance/check-in")
                .header(header::CONTENT_TYPE, "application/json")
                .header(SUBJECT_HEADER, "stu-1001")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(payload["status"], "present");

        let (status, rows) = send(
            &router,
            Request::get("/api/v1/attendance/courses/CS101/summary")
                .header(SUBJECT_HEADER, "fac-1")
                .header(ROLE_HEADER, "faculty")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rows[0]["subject"], "stu-1001");
        assert_eq!(rows[0]["rate"], 100);
        assert_eq!(rows[0]["band"], "high");

        assert_eq!(services.outbox.sent().len(), 1);
    }
}
