use crate::infra::parse_datetime;
use crate::routes::PortalServices;
use campus_portal::config::{AppConfig, AttendanceConfig};
use campus_portal::error::AppError;
use campus_portal::workflows::attendance::{
    export_history_csv, meters_over, CheckInAttempt, CheckInDecision, CheckInRejection,
    CheckInServiceError, CourseId, DailySchedule, EligibilityEngine, GeoPoint, LocationReading,
    WindowDraft, WindowPolicy,
};
use campus_portal::workflows::clock::FixedClock;
use campus_portal::workflows::enrollment::CatalogFilter;
use campus_portal::workflows::identity::{Identity, Role, SubjectId};
use chrono::{Local, NaiveDateTime, NaiveTime};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct CheckInArgs {
    /// Reported latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) latitude: f64,
    /// Reported longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) longitude: f64,
    /// Local time of the attempt (YYYY-MM-DDTHH:MM). Defaults to now.
    #[arg(long, value_parser = parse_datetime)]
    pub(crate) at: Option<NaiveDateTime>,
    /// Treat the subject as already checked in today.
    #[arg(long)]
    pub(crate) already_checked_in: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Local date and time the walkthrough runs at (YYYY-MM-DDTHH:MM). Defaults to today 08:50.
    #[arg(long, value_parser = parse_datetime)]
    pub(crate) at: Option<NaiveDateTime>,
    /// Print the student's attendance history as CSV at the end.
    #[arg(long)]
    pub(crate) csv: bool,
}

pub(crate) fn run_check_in(args: CheckInArgs) -> Result<(), AppError> {
    let CheckInArgs {
        latitude,
        longitude,
        at,
        already_checked_in,
    } = args;

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::Input(format!(
            "coordinates ({latitude}, {longitude}) are outside the valid range"
        )));
    }

    let config = AppConfig::load()?;
    let now = at.unwrap_or_else(|| Local::now().naive_local());
    let engine = EligibilityEngine::new(config.attendance.campus.clone());
    let schedule = DailySchedule::reference();
    let attempt = CheckInAttempt {
        subject: Some(SubjectId("cli".to_string())),
        course: None,
        location: LocationReading::at(latitude, longitude),
    };

    let decision = engine.evaluate(&attempt, &schedule, already_checked_in, now);
    render_decision(&config.attendance, &schedule, now, &decision);
    Ok(())
}

fn render_decision(
    attendance: &AttendanceConfig,
    schedule: &DailySchedule,
    now: NaiveDateTime,
    decision: &CheckInDecision,
) {
    let campus = &attendance.campus;
    println!("Campus check-in evaluation");
    println!(
        "Campus: {} ({:.6}, {:.6}) radius {:.0} m",
        campus.name, campus.center.latitude, campus.center.longitude, campus.allowed_radius_meters
    );
    println!("Evaluated at: {}", now.format("%Y-%m-%d %H:%M"));
    println!("Windows: {}", schedule.describe());
    if let Some(distance) = decision.distance_meters {
        println!("Distance from campus: {:.0} m", distance);
    }

    let verdict = if decision.accepted() {
        "ACCEPTED"
    } else {
        "REJECTED"
    };
    println!("Decision: {} - {}", verdict, decision.summary());

    if let Some(CheckInRejection::OutsideRadius {
        distance_meters,
        required_meters,
    }) = decision.rejection()
    {
        println!(
            "  Move {} m closer to campus to clock in.",
            meters_over(*distance_meters, *required_meters)
        );
    }

    match serde_json::to_string_pretty(decision) {
        Ok(json) => println!("{}", json),
        Err(err) => println!("Decision payload unavailable: {}", err),
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { at, csv } = args;

    let now = at.unwrap_or_else(|| {
        Local::now()
            .date_naive()
            .and_time(NaiveTime::from_hms_opt(8, 50, 0).unwrap_or_default())
    });
    let config = AttendanceConfig::default();
    let services = PortalServices::in_memory(&config, Arc::new(FixedClock(now)));
    let campus = config.campus.center;

    println!("Campus portal demo ({})", now.format("%A %Y-%m-%d %H:%M"));
    println!(
        "Geofence: {} m around {} | windows: {}",
        config.campus.allowed_radius_meters,
        config.campus.name,
        services.check_in.schedule().describe()
    );

    let student = Identity::new("stu-1001", Role::Student);
    let faculty = Identity::new("fac-2001", Role::Faculty);
    let course = CourseId("CS101".to_string());

    println!("\nCourse catalog");
    match services
        .enrollment
        .catalog(&student.subject, &CatalogFilter::default())
    {
        Ok(entries) => {
            for entry in entries {
                println!(
                    "- {} {} ({} credits, {} seats left)",
                    entry.course.code,
                    entry.course.name,
                    entry.course.credits,
                    entry.seats_remaining
                );
            }
        }
        Err(err) => println!("  Catalog unavailable: {}", err),
    }
    match services.enrollment.enroll(&student.subject, &course) {
        Ok(enrollment) => println!(
            "Enrolled {} in {}",
            enrollment.subject.0, enrollment.course.0
        ),
        Err(err) => println!("  Enrollment failed: {}", err),
    }

    println!("\nCheck-in attempts");
    let far_away = GeoPoint::new(campus.latitude + 0.009, campus.longitude);
    let attempts = [
        ("from 1 km away", far_away, Some(course.clone())),
        ("from the main gate", campus, Some(course.clone())),
        ("again from the main gate", campus, Some(course.clone())),
    ];
    for (label, point, course_id) in attempts {
        let attempt = CheckInAttempt {
            subject: Some(student.subject.clone()),
            course: course_id,
            location: LocationReading::at(point.latitude, point.longitude),
        };
        match services.check_in.check_in(attempt) {
            Ok(receipt) => println!(
                "- {}: {} (record {})",
                label,
                receipt.decision.summary(),
                receipt.record.id.0
            ),
            Err(CheckInServiceError::Rejected(rejection)) => {
                println!("- {}: rejected [{}] {}", label, rejection.code(), rejection)
            }
            Err(err) => println!("- {}: {}", label, err),
        }
    }

    println!("\nFaculty schedule for {}", course.0);
    let draft = WindowDraft {
        day_of_week: 1,
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
        end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
        grace_period_minutes: 10,
    };
    match services.windows.create(&faculty, course.clone(), draft) {
        Ok(window) => println!(
            "- created {} on day {} {}-{} (grace {} min)",
            window.id.0,
            window.day_of_week,
            window.start_time.format("%H:%M"),
            window.end_time.format("%H:%M"),
            window.grace_period_minutes
        ),
        Err(err) => println!("  Window rejected: {}", err),
    }
    let student_draft = WindowDraft {
        day_of_week: 2,
        start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
        end_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap_or_default(),
        grace_period_minutes: 0,
    };
    if let Err(err) = services
        .windows
        .create(&student, course.clone(), student_draft)
    {
        println!("- student attempt refused: {}", err);
    }

    println!("\nMonitoring");
    let course_name = services
        .catalog
        .name_of(&course)
        .unwrap_or_else(|| course.0.clone());
    match services.monitor.course_summary(&faculty, &course) {
        Ok(rows) => {
            for row in rows {
                println!(
                    "- {}: {} records | {} present | {} late | {} absent | {}% ({})",
                    row.subject.0,
                    row.total,
                    row.present,
                    row.late,
                    row.absent,
                    row.rate,
                    row.band.label()
                );
            }
        }
        Err(err) => println!("  Summary unavailable: {}", err),
    }
    match services
        .monitor
        .alert_low_attendance(&faculty, &course, &course_name, &student.subject)
    {
        Ok(summary) => println!("- alert sent to {} at {}%", summary.subject.0, summary.rate),
        Err(err) => println!("  Alert failed: {}", err),
    }

    println!("\nNotifications");
    for notification in services.outbox.sent() {
        println!(
            "- [{}] {} -> {}: {}",
            notification.kind.label(),
            notification.title,
            notification.subject.0,
            notification.message
        );
    }

    if csv {
        println!("\nAttendance history (CSV)");
        let history = services.check_in.history(&student.subject)?;
        export_history_csv(&history, std::io::stdout())?;
    }

    Ok(())
}
