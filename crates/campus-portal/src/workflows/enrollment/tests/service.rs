use std::sync::Arc;

use super::common::*;
use crate::workflows::attendance::CourseId;
use crate::workflows::clock::FixedClock;
use crate::workflows::enrollment::{CatalogFilter, EnrollmentError, EnrollmentService};
use crate::workflows::identity::SubjectId;
use crate::workflows::notifications::NotificationKind;

#[test]
fn catalog_is_sorted_by_name_and_hides_joined_courses() {
    let (service, _, _) = build_service();
    service
        .enroll(&student(), &CourseId("MATH201".to_string()))
        .expect("enrolled");

    let entries = service
        .catalog(&student(), &CatalogFilter::default())
        .expect("catalog loads");
    let names: Vec<_> = entries.iter().map(|entry| entry.course.name.as_str()).collect();
    assert_eq!(names, vec!["Data Structures", "Introduction to Computing"]);
    assert_eq!(entries[1].seats_remaining, 2);
}

#[test]
fn catalog_filters_combine() {
    let (service, _, _) = build_service();

    let search = CatalogFilter {
        search: Some("computer".to_string()),
        ..CatalogFilter::default()
    };
    assert_eq!(service.catalog(&student(), &search).expect("catalog").len(), 2);

    let narrowed = CatalogFilter {
        search: Some("computer".to_string()),
        credits: Some(4),
        ..CatalogFilter::default()
    };
    let entries = service.catalog(&student(), &narrowed).expect("catalog");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].course.code, "CS240");

    let by_code = CatalogFilter {
        search: Some("math2".to_string()),
        department: Some("Mathematics".to_string()),
        semester: Some("Spring 2025".to_string()),
        ..CatalogFilter::default()
    };
    assert_eq!(service.catalog(&student(), &by_code).expect("catalog").len(), 1);
}

#[test]
fn enrollment_publishes_a_notification() {
    let (service, enrollments, notifications) = build_service();

    let enrollment = service
        .enroll(&student(), &CourseId("CS101".to_string()))
        .expect("enrolled");
    assert_eq!(enrollment.enrolled_at, now());
    assert_eq!(enrollments.len(), 1);

    let sent = notifications.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::Enrollment);
    assert_eq!(sent[0].title, "Course Enrollment Successful");
    assert!(sent[0].message.contains("CS101 - Introduction to Computing"));
}

#[test]
fn enrollment_rules() {
    let (service, _, _) = build_service();

    let missing = service.enroll(&student(), &CourseId("BIO999".to_string()));
    assert!(matches!(missing, Err(EnrollmentError::CourseNotFound(_))));

    let cs240 = CourseId("CS240".to_string());
    service.enroll(&student(), &cs240).expect("first seat");

    let again = service.enroll(&student(), &cs240);
    assert!(matches!(again, Err(EnrollmentError::AlreadyEnrolled)));

    let full = service.enroll(&SubjectId("stu-2002".to_string()), &cs240);
    assert!(matches!(
        full,
        Err(EnrollmentError::CourseFull { capacity: 1 })
    ));
}

#[test]
fn notification_failure_does_not_undo_enrollment() {
    let enrollments = Arc::new(MemoryEnrollments::default());
    let service = EnrollmentService::with_clock(
        Arc::new(MemoryCourses { courses: catalog() }),
        enrollments.clone(),
        Arc::new(BrokenNotifications),
        Arc::new(FixedClock(now())),
    );

    service
        .enroll(&student(), &CourseId("CS101".to_string()))
        .expect("enrollment stands");
    assert_eq!(enrollments.len(), 1);
}
