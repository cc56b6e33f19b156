#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use coursebell::canvas::CanvasClient;
use coursebell::error::AppError;
use coursebell::models::{AssignmentKey, AssignmentUpsert, Course};
use coursebell::notify::{Notifier, NotifyTarget};
use coursebell::store;
use coursebell::week::week_key_of;

pub async fn setup_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test db");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

pub fn course(id: i64, name: &str) -> Course {
    Course {
        id,
        name: name.to_string(),
        course_code: Some(format!("C{id}")),
        start_at: None,
        end_at: None,
    }
}

pub fn assignment(course_id: i64, id: i64, name: &str, due_at: Option<DateTime<Utc>>) -> AssignmentUpsert {
    AssignmentUpsert {
        id,
        course_id,
        name: name.to_string(),
        due_at,
        html_url: Some(format!("https://canvas.example/courses/{course_id}/assignments/{id}")),
        submitted: false,
    }
}

/// Insert a course and one assignment directly through the store.
pub async fn seed_assignment(
    pool: &SqlitePool,
    course_id: i64,
    assignment_id: i64,
    due_at: DateTime<Utc>,
) -> AssignmentKey {
    store::upsert_course(pool, &course(course_id, "Linear Algebra"))
        .await
        .expect("seed course");
    let record = assignment(course_id, assignment_id, "Problem Set", Some(due_at));
    store::upsert_assignment(pool, &record, Some(week_key_of(due_at)))
        .await
        .expect("seed assignment");
    AssignmentKey { course_id, assignment_id }
}

/// Captures every dispatched payload.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(NotifyTarget, String)>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent_to(&self, target: &NotifyTarget) -> usize {
        self.sent.lock().unwrap().iter().filter(|(t, _)| t == target).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, target: &NotifyTarget, message: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push((target.clone(), message.to_string()));
        Ok(())
    }
}

/// Always fails, leaving reminder flags untouched.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _target: &NotifyTarget, _message: &str) -> Result<(), AppError> {
        Err(AppError::Notify("delivery unavailable".to_string()))
    }
}

/// In-memory fetch collaborator. `fail_assignments_for` makes the
/// assignment fetch for one course id error, simulating a transport
/// failure mid-pass.
#[derive(Default)]
pub struct StaticCanvasClient {
    pub courses: Vec<Course>,
    pub assignments: HashMap<i64, Vec<AssignmentUpsert>>,
    pub fail_assignments_for: Option<i64>,
}

#[async_trait]
impl CanvasClient for StaticCanvasClient {
    async fn fetch_courses(&self) -> Result<Vec<Course>, AppError> {
        Ok(self.courses.clone())
    }

    async fn fetch_assignments(&self, course_id: i64) -> Result<Vec<AssignmentUpsert>, AppError> {
        if self.fail_assignments_for == Some(course_id) {
            return Err(AppError::Canvas("502: bad gateway".to_string()));
        }
        Ok(self.assignments.get(&course_id).cloned().unwrap_or_default())
    }
}
