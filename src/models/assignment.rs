use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Composite identity of an assignment. Canvas assignment ids are only
/// unique within their course, so the pair travels together everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentKey {
    pub course_id: i64,
    pub assignment_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    pub due_at: Option<DateTime<Utc>>,
    pub week_key: Option<String>,
    pub html_url: Option<String>,
    pub submitted: bool,
    pub due_reminder_2d_sent: bool,
    pub due_reminder_1d_sent: bool,
    pub due_reminder_12h_sent: bool,
}

impl Assignment {
    pub fn key(&self) -> AssignmentKey {
        AssignmentKey {
            course_id: self.course_id,
            assignment_id: self.id,
        }
    }
}

/// Fields written by the sync reconciler. The reminder flags are absent on
/// purpose: an upsert must never touch them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentUpsert {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    pub due_at: Option<DateTime<Utc>>,
    pub html_url: Option<String>,
    pub submitted: bool,
}

/// Due-date reminder classes. Each is dispatched at most once per
/// assignment: `PENDING -> SENT`, and a window that passes without a send
/// is permanently missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DueReminder {
    TwoDay,
    OneDay,
    TwelveHour,
}

impl DueReminder {
    pub const ALL: [DueReminder; 3] =
        [DueReminder::TwoDay, DueReminder::OneDay, DueReminder::TwelveHour];

    /// Lead time subtracted from the due instant to get the dispatch target.
    pub fn lead(self) -> Duration {
        match self {
            DueReminder::TwoDay => Duration::hours(48),
            DueReminder::OneDay => Duration::hours(24),
            DueReminder::TwelveHour => Duration::hours(12),
        }
    }

    pub(crate) fn column(self) -> &'static str {
        match self {
            DueReminder::TwoDay => "due_reminder_2d_sent",
            DueReminder::OneDay => "due_reminder_1d_sent",
            DueReminder::TwelveHour => "due_reminder_12h_sent",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DueReminder::TwoDay => "2-day reminder",
            DueReminder::OneDay => "1-day reminder",
            DueReminder::TwelveHour => "12-hour reminder",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            DueReminder::TwoDay => "You have 2 days to complete this assignment!",
            DueReminder::OneDay => "Only 1 day left to complete this assignment!",
            DueReminder::TwelveHour => "Only 12 hours left! Time to finish up!",
        }
    }
}

/// Reminder candidate row: an assignment joined with its course, restricted
/// to rows with a due date and at least one unsent class.
#[derive(Debug, Clone, FromRow)]
pub struct DueCandidate {
    pub assignment_id: i64,
    pub course_id: i64,
    pub name: String,
    pub due_at: DateTime<Utc>,
    pub course_code: Option<String>,
    pub course_name: String,
    pub due_reminder_2d_sent: bool,
    pub due_reminder_1d_sent: bool,
    pub due_reminder_12h_sent: bool,
}

impl DueCandidate {
    pub fn key(&self) -> AssignmentKey {
        AssignmentKey {
            course_id: self.course_id,
            assignment_id: self.assignment_id,
        }
    }

    pub fn sent(&self, class: DueReminder) -> bool {
        match class {
            DueReminder::TwoDay => self.due_reminder_2d_sent,
            DueReminder::OneDay => self.due_reminder_1d_sent,
            DueReminder::TwelveHour => self.due_reminder_12h_sent,
        }
    }
}

/// Display row for the weekly overview: assignment plus per-user completion.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WeekAssignmentStatus {
    pub assignment_id: i64,
    pub course_id: i64,
    pub name: String,
    pub due_at: Option<DateTime<Utc>>,
    pub course_code: Option<String>,
    pub course_name: String,
    pub completed: bool,
    pub submitted: bool,
}
