//! SQLite persistence. All mutable state lives here; services read and
//! write records as values through these operations.
//!
//! Reminder flags are one-directional: the `set_*_flag` operations are
//! single-row compare-and-set updates that no-op once the flag is true,
//! and the upserts never mention flag columns, so a sync can never reset
//! dispatch state.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::{
    Assignment, AssignmentKey, AssignmentUpsert, Course, DueCandidate, DueReminder, PlanCandidate,
    PlanDetail, PlanKey, PlanReminder, StudyPlan, WeekAssignmentStatus,
};
use crate::week::WeekKey;

// ----------------------------------------------------------------------
// Courses
// ----------------------------------------------------------------------

pub async fn upsert_course(db: &SqlitePool, course: &Course) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO courses (id, name, course_code, start_at, end_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            course_code = excluded.course_code,
            start_at = excluded.start_at,
            end_at = excluded.end_at
        "#,
    )
    .bind(course.id)
    .bind(&course.name)
    .bind(&course.course_code)
    .bind(course.start_at)
    .bind(course.end_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn fetch_courses(db: &SqlitePool) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        "SELECT id, name, course_code, start_at, end_at FROM courses ORDER BY name",
    )
    .fetch_all(db)
    .await
}

// ----------------------------------------------------------------------
// Assignments
// ----------------------------------------------------------------------

/// Insert-or-update by (course_id, id). Only externally-owned fields and
/// the derived week key are written; reminder flags keep their prior value
/// (inserts default them to false via the schema).
pub async fn upsert_assignment(
    db: &SqlitePool,
    record: &AssignmentUpsert,
    week_key: Option<WeekKey>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO assignments (id, course_id, name, due_at, week_key, html_url, submitted)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(course_id, id) DO UPDATE SET
            name = excluded.name,
            due_at = excluded.due_at,
            week_key = excluded.week_key,
            html_url = excluded.html_url,
            submitted = excluded.submitted
        "#,
    )
    .bind(record.id)
    .bind(record.course_id)
    .bind(&record.name)
    .bind(record.due_at)
    .bind(week_key.map(|k| k.to_string()))
    .bind(&record.html_url)
    .bind(record.submitted)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find_assignment(
    db: &SqlitePool,
    key: AssignmentKey,
) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(
        r#"
        SELECT id, course_id, name, due_at, week_key, html_url, submitted,
               due_reminder_2d_sent, due_reminder_1d_sent, due_reminder_12h_sent
        FROM assignments
        WHERE course_id = ? AND id = ?
        "#,
    )
    .bind(key.course_id)
    .bind(key.assignment_id)
    .fetch_optional(db)
    .await
}

/// Compare-and-set a due-date reminder flag. Returns false when the flag
/// was already true (the at-most-one transition already happened).
pub async fn set_due_flag(
    db: &SqlitePool,
    key: AssignmentKey,
    class: DueReminder,
) -> Result<bool, sqlx::Error> {
    let col = class.column();
    let sql =
        format!("UPDATE assignments SET {col} = 1 WHERE course_id = ? AND id = ? AND {col} = 0");
    let affected = sqlx::query(&sql)
        .bind(key.course_id)
        .bind(key.assignment_id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

/// Broad candidate query for due-date reminders: assignments with a due
/// instant inside `[from, to]` and at least one unsent class, joined with
/// course metadata. The scheduler applies the exact per-class window.
pub async fn assignments_due_between(
    db: &SqlitePool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<DueCandidate>, sqlx::Error> {
    sqlx::query_as::<_, DueCandidate>(
        r#"
        SELECT a.id AS assignment_id, a.course_id, a.name, a.due_at,
               c.course_code, c.name AS course_name,
               a.due_reminder_2d_sent, a.due_reminder_1d_sent, a.due_reminder_12h_sent
        FROM assignments a
        JOIN courses c ON c.id = a.course_id
        WHERE a.due_at IS NOT NULL
          AND a.due_at BETWEEN ? AND ?
          AND (a.due_reminder_2d_sent = 0
               OR a.due_reminder_1d_sent = 0
               OR a.due_reminder_12h_sent = 0)
        ORDER BY a.due_at
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await
}

/// Weekly overview with per-user completion status.
pub async fn week_assignments_with_status(
    db: &SqlitePool,
    user_id: &str,
    week_key: WeekKey,
) -> Result<Vec<WeekAssignmentStatus>, sqlx::Error> {
    sqlx::query_as::<_, WeekAssignmentStatus>(
        r#"
        SELECT a.id AS assignment_id, a.course_id, a.name, a.due_at,
               c.course_code, c.name AS course_name,
               COALESCE(uas.completed, 0) AS completed,
               a.submitted
        FROM assignments a
        JOIN courses c ON c.id = a.course_id
        LEFT JOIN user_assignment_status uas
          ON uas.user_id = ? AND uas.course_id = a.course_id AND uas.assignment_id = a.id
        WHERE a.week_key = ?
        ORDER BY a.due_at
        "#,
    )
    .bind(user_id)
    .bind(week_key.to_string())
    .fetch_all(db)
    .await
}

// ----------------------------------------------------------------------
// Study plans
// ----------------------------------------------------------------------

/// Create or re-plan a session. Replaces the instant and notes but leaves
/// reminder flags alone; resetting them is the deliberate job of
/// [`reschedule_plan`].
pub async fn upsert_study_plan(
    db: &SqlitePool,
    key: &PlanKey,
    planned_at: DateTime<Utc>,
    notes: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO study_plans (user_id, course_id, assignment_id, planned_at, notes)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id, course_id, assignment_id) DO UPDATE SET
            planned_at = excluded.planned_at,
            notes = excluded.notes
        "#,
    )
    .bind(&key.user_id)
    .bind(key.course_id)
    .bind(key.assignment_id)
    .bind(planned_at)
    .bind(notes)
    .execute(db)
    .await?;
    Ok(())
}

/// Move an existing plan to a new instant and re-arm all three reminder
/// classes. Returns false when no such plan exists.
pub async fn reschedule_plan(
    db: &SqlitePool,
    key: &PlanKey,
    planned_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query(
        r#"
        UPDATE study_plans
        SET planned_at = ?,
            reminder_24h_sent = 0,
            reminder_1h_sent = 0,
            reminder_now_sent = 0
        WHERE user_id = ? AND course_id = ? AND assignment_id = ?
        "#,
    )
    .bind(planned_at)
    .bind(&key.user_id)
    .bind(key.course_id)
    .bind(key.assignment_id)
    .execute(db)
    .await?
    .rows_affected();
    Ok(affected > 0)
}

pub async fn find_plan(db: &SqlitePool, key: &PlanKey) -> Result<Option<StudyPlan>, sqlx::Error> {
    sqlx::query_as::<_, StudyPlan>(
        r#"
        SELECT user_id, course_id, assignment_id, planned_at, notes,
               reminder_24h_sent, reminder_1h_sent, reminder_now_sent
        FROM study_plans
        WHERE user_id = ? AND course_id = ? AND assignment_id = ?
        "#,
    )
    .bind(&key.user_id)
    .bind(key.course_id)
    .bind(key.assignment_id)
    .fetch_optional(db)
    .await
}

/// Compare-and-set a work-session reminder flag.
pub async fn set_plan_flag(
    db: &SqlitePool,
    key: &PlanKey,
    class: PlanReminder,
) -> Result<bool, sqlx::Error> {
    let col = class.column();
    let sql = format!(
        "UPDATE study_plans SET {col} = 1 \
         WHERE user_id = ? AND course_id = ? AND assignment_id = ? AND {col} = 0"
    );
    let affected = sqlx::query(&sql)
        .bind(&key.user_id)
        .bind(key.course_id)
        .bind(key.assignment_id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

/// Broad candidate query for work-session reminders: plans whose instant
/// lies inside `[from, to]` with at least one unsent class.
pub async fn plans_in_window(
    db: &SqlitePool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<PlanCandidate>, sqlx::Error> {
    sqlx::query_as::<_, PlanCandidate>(
        r#"
        SELECT sp.user_id, sp.course_id, sp.assignment_id, sp.planned_at, sp.notes,
               sp.reminder_24h_sent, sp.reminder_1h_sent, sp.reminder_now_sent,
               a.name AS assignment_name, a.due_at,
               c.course_code, c.name AS course_name
        FROM study_plans sp
        JOIN assignments a ON a.id = sp.assignment_id AND a.course_id = sp.course_id
        JOIN courses c ON c.id = sp.course_id
        WHERE sp.planned_at BETWEEN ? AND ?
          AND (sp.reminder_24h_sent = 0
               OR sp.reminder_1h_sent = 0
               OR sp.reminder_now_sent = 0)
        ORDER BY sp.planned_at
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await
}

/// A user's planned sessions inside `[from, to)`, joined for display.
pub async fn user_plans_between(
    db: &SqlitePool,
    user_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<PlanDetail>, sqlx::Error> {
    sqlx::query_as::<_, PlanDetail>(
        r#"
        SELECT sp.user_id, sp.course_id, sp.assignment_id, sp.planned_at, sp.notes,
               a.name AS assignment_name, a.due_at,
               c.course_code, c.name AS course_name
        FROM study_plans sp
        JOIN assignments a ON a.id = sp.assignment_id AND a.course_id = sp.course_id
        JOIN courses c ON c.id = sp.course_id
        WHERE sp.user_id = ? AND sp.planned_at >= ? AND sp.planned_at < ?
        ORDER BY sp.planned_at
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await
}

// ----------------------------------------------------------------------
// Completion tracking
// ----------------------------------------------------------------------

/// Idempotent per-user completion upsert.
pub async fn set_completed(
    db: &SqlitePool,
    user_id: &str,
    key: AssignmentKey,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_assignment_status (user_id, course_id, assignment_id, completed, completed_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id, course_id, assignment_id) DO UPDATE SET
            completed = excluded.completed,
            completed_at = excluded.completed_at
        "#,
    )
    .bind(user_id)
    .bind(key.course_id)
    .bind(key.assignment_id)
    .bind(completed)
    .bind(completed_at)
    .execute(db)
    .await?;
    Ok(())
}

/// (total, completed) counts of a user's assignments in the given week.
/// Assignments without a due date never count toward completeness.
pub async fn week_totals(
    db: &SqlitePool,
    user_id: &str,
    week_key: WeekKey,
) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COUNT(*),
               COALESCE(SUM(CASE WHEN uas.completed = 1 THEN 1 ELSE 0 END), 0)
        FROM assignments a
        LEFT JOIN user_assignment_status uas
          ON uas.user_id = ? AND uas.course_id = a.course_id AND uas.assignment_id = a.id
        WHERE a.week_key = ? AND a.due_at IS NOT NULL
        "#,
    )
    .bind(user_id)
    .bind(week_key.to_string())
    .fetch_one(db)
    .await
}

/// (tracked, done): how many users the store knows about at all, and how
/// many of them completed the given assignment. Used to decide whether a
/// broadcast due reminder has any eligible recipient left.
pub async fn tracked_completion_counts(
    db: &SqlitePool,
    key: AssignmentKey,
) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COUNT(*),
               COALESCE(SUM(CASE WHEN EXISTS (
                   SELECT 1 FROM user_assignment_status s
                   WHERE s.user_id = u.user_id
                     AND s.course_id = ?
                     AND s.assignment_id = ?
                     AND s.completed = 1
               ) THEN 1 ELSE 0 END), 0)
        FROM (
            SELECT user_id FROM study_plans
            UNION
            SELECT user_id FROM user_assignment_status
        ) AS u
        "#,
    )
    .bind(key.course_id)
    .bind(key.assignment_id)
    .fetch_one(db)
    .await
}

pub async fn week_notified(
    db: &SqlitePool,
    user_id: &str,
    week_key: WeekKey,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query_as::<_, (bool,)>(
        "SELECT notified FROM week_completion_notifications WHERE user_id = ? AND week_key = ?",
    )
    .bind(user_id)
    .bind(week_key.to_string())
    .fetch_optional(db)
    .await?;
    Ok(row.map(|(n,)| n).unwrap_or(false))
}

pub async fn set_week_notified(
    db: &SqlitePool,
    user_id: &str,
    week_key: WeekKey,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO week_completion_notifications (user_id, week_key, notified)
        VALUES (?, ?, 1)
        ON CONFLICT(user_id, week_key) DO UPDATE SET notified = 1
        "#,
    )
    .bind(user_id)
    .bind(week_key.to_string())
    .execute(db)
    .await?;
    Ok(())
}
