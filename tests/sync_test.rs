mod common;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;

use common::{StaticCanvasClient, assignment, course, setup_db, utc};
use coursebell::models::{AssignmentKey, DueReminder};
use coursebell::services::SyncService;
use coursebell::store;

#[tokio::test]
async fn sync_inserts_then_updates_without_duplicates() {
    let pool = setup_db().await;
    let due = utc(2025, 11, 24, 17, 0, 0);

    let client = StaticCanvasClient {
        courses: vec![course(1, "Linear Algebra")],
        assignments: HashMap::from([(1, vec![assignment(1, 100, "Problem Set 1", Some(due))])]),
        ..Default::default()
    };
    let service = SyncService::new(pool.clone(), Arc::new(client));
    let stats = service.sync_all().await.expect("first sync");
    assert_eq!(stats.courses_synced, 1);
    assert_eq!(stats.assignments_synced, 1);

    // Same identities, changed mutable fields.
    let client = StaticCanvasClient {
        courses: vec![course(1, "Linear Algebra II")],
        assignments: HashMap::from([(
            1,
            vec![assignment(1, 100, "Problem Set 1 (revised)", Some(due + Duration::hours(2)))],
        )]),
        ..Default::default()
    };
    let service = SyncService::new(pool.clone(), Arc::new(client));
    service.sync_all().await.expect("second sync");

    let courses = store::fetch_courses(&pool).await.expect("courses");
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].name, "Linear Algebra II");

    let key = AssignmentKey { course_id: 1, assignment_id: 100 };
    let stored = store::find_assignment(&pool, key).await.expect("find").expect("exists");
    assert_eq!(stored.name, "Problem Set 1 (revised)");
    assert_eq!(stored.due_at, Some(due + Duration::hours(2)));
}

#[tokio::test]
async fn sync_preserves_dispatched_reminder_flags() {
    let pool = setup_db().await;
    let due = utc(2025, 11, 24, 17, 0, 0);
    let key = AssignmentKey { course_id: 1, assignment_id: 100 };

    let client = StaticCanvasClient {
        courses: vec![course(1, "Linear Algebra")],
        assignments: HashMap::from([(1, vec![assignment(1, 100, "Problem Set 1", Some(due))])]),
        ..Default::default()
    };
    SyncService::new(pool.clone(), Arc::new(client))
        .sync_all()
        .await
        .expect("first sync");

    assert!(store::set_due_flag(&pool, key, DueReminder::OneDay).await.expect("flag"));

    let client = StaticCanvasClient {
        courses: vec![course(1, "Linear Algebra")],
        assignments: HashMap::from([(1, vec![assignment(1, 100, "Renamed", Some(due))])]),
        ..Default::default()
    };
    SyncService::new(pool.clone(), Arc::new(client))
        .sync_all()
        .await
        .expect("second sync");

    let stored = store::find_assignment(&pool, key).await.expect("find").expect("exists");
    assert_eq!(stored.name, "Renamed");
    assert!(stored.due_reminder_1d_sent);
    assert!(!stored.due_reminder_2d_sent);
    assert!(!stored.due_reminder_12h_sent);
}

#[tokio::test]
async fn week_key_is_derived_from_due_instant() {
    let pool = setup_db().await;

    let client = StaticCanvasClient {
        courses: vec![course(1, "Linear Algebra")],
        assignments: HashMap::from([(
            1,
            vec![
                assignment(1, 100, "Monday due", Some(utc(2025, 11, 24, 17, 0, 0))),
                // Monday midnight belongs to the new week.
                assignment(1, 101, "Boundary due", Some(utc(2025, 11, 24, 0, 0, 0))),
                assignment(1, 102, "Prior Sunday", Some(utc(2025, 11, 23, 23, 59, 59))),
            ],
        )]),
        ..Default::default()
    };
    SyncService::new(pool.clone(), Arc::new(client))
        .sync_all()
        .await
        .expect("sync");

    for (id, expected) in [(100, "2025-W48"), (101, "2025-W48"), (102, "2025-W47")] {
        let key = AssignmentKey { course_id: 1, assignment_id: id };
        let stored = store::find_assignment(&pool, key).await.expect("find").expect("exists");
        assert_eq!(stored.week_key.as_deref(), Some(expected), "assignment {id}");
    }
}

#[tokio::test]
async fn dateless_assignment_is_stored_but_never_a_candidate() {
    let pool = setup_db().await;

    let client = StaticCanvasClient {
        courses: vec![course(1, "Linear Algebra")],
        assignments: HashMap::from([(1, vec![assignment(1, 100, "Ungraded survey", None)])]),
        ..Default::default()
    };
    let stats = SyncService::new(pool.clone(), Arc::new(client))
        .sync_all()
        .await
        .expect("sync");
    assert_eq!(stats.assignments_without_due_date, 1);

    let key = AssignmentKey { course_id: 1, assignment_id: 100 };
    let stored = store::find_assignment(&pool, key).await.expect("find").expect("exists");
    assert_eq!(stored.week_key, None);

    // Any window: the dateless row never shows up as a reminder candidate.
    let candidates = store::assignments_due_between(
        &pool,
        utc(2020, 1, 1, 0, 0, 0),
        utc(2030, 1, 1, 0, 0, 0),
    )
    .await
    .expect("candidates");
    assert!(candidates.is_empty());
}

#[tokio::test]
async fn fetch_failure_aborts_pass_keeping_earlier_courses() {
    let pool = setup_db().await;
    let due = utc(2025, 11, 24, 17, 0, 0);

    let client = StaticCanvasClient {
        courses: vec![course(1, "Linear Algebra"), course(2, "Statistics")],
        assignments: HashMap::from([
            (1, vec![assignment(1, 100, "Problem Set 1", Some(due))]),
            (2, vec![assignment(2, 200, "Quiz", Some(due))]),
        ]),
        fail_assignments_for: Some(2),
    };
    let result = SyncService::new(pool.clone(), Arc::new(client)).sync_all().await;
    assert!(result.is_err());

    // Course 1's batch landed before the failure; course 2 has no rows.
    let key1 = AssignmentKey { course_id: 1, assignment_id: 100 };
    assert!(store::find_assignment(&pool, key1).await.expect("find").is_some());
    let key2 = AssignmentKey { course_id: 2, assignment_id: 200 };
    assert!(store::find_assignment(&pool, key2).await.expect("find").is_none());
}
