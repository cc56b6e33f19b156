use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Composite identity of a study plan: one planned work session per user
/// per assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanKey {
    pub user_id: String,
    pub course_id: i64,
    pub assignment_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudyPlan {
    pub user_id: String,
    pub course_id: i64,
    pub assignment_id: i64,
    pub planned_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub reminder_24h_sent: bool,
    pub reminder_1h_sent: bool,
    pub reminder_now_sent: bool,
}

/// Work-session reminder classes anchored on the planned instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanReminder {
    TwentyFourHour,
    OneHour,
    Now,
}

impl PlanReminder {
    pub const ALL: [PlanReminder; 3] =
        [PlanReminder::TwentyFourHour, PlanReminder::OneHour, PlanReminder::Now];

    pub fn lead(self) -> Duration {
        match self {
            PlanReminder::TwentyFourHour => Duration::hours(24),
            PlanReminder::OneHour => Duration::hours(1),
            PlanReminder::Now => Duration::zero(),
        }
    }

    /// Largest lead time; bounds the candidate window a tick has to scan.
    pub fn max_lead() -> Duration {
        Duration::hours(24)
    }

    pub(crate) fn column(self) -> &'static str {
        match self {
            PlanReminder::TwentyFourHour => "reminder_24h_sent",
            PlanReminder::OneHour => "reminder_1h_sent",
            PlanReminder::Now => "reminder_now_sent",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlanReminder::TwentyFourHour => "24-hour reminder",
            PlanReminder::OneHour => "1-hour reminder",
            PlanReminder::Now => "It's time!",
        }
    }
}

/// Reminder candidate row: a study plan joined with its assignment and
/// course for payload rendering.
#[derive(Debug, Clone, FromRow)]
pub struct PlanCandidate {
    pub user_id: String,
    pub course_id: i64,
    pub assignment_id: i64,
    pub planned_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub reminder_24h_sent: bool,
    pub reminder_1h_sent: bool,
    pub reminder_now_sent: bool,
    pub assignment_name: String,
    pub due_at: Option<DateTime<Utc>>,
    pub course_code: Option<String>,
    pub course_name: String,
}

impl PlanCandidate {
    pub fn key(&self) -> PlanKey {
        PlanKey {
            user_id: self.user_id.clone(),
            course_id: self.course_id,
            assignment_id: self.assignment_id,
        }
    }

    pub fn sent(&self, class: PlanReminder) -> bool {
        match class {
            PlanReminder::TwentyFourHour => self.reminder_24h_sent,
            PlanReminder::OneHour => self.reminder_1h_sent,
            PlanReminder::Now => self.reminder_now_sent,
        }
    }
}

/// Display row for a user's planned sessions this week.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PlanDetail {
    pub user_id: String,
    pub course_id: i64,
    pub assignment_id: i64,
    pub planned_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub assignment_name: String,
    pub due_at: Option<DateTime<Utc>>,
    pub course_code: Option<String>,
    pub course_name: String,
}
