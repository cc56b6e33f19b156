use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Raw Canvas course payload. Canvas occasionally returns stub entries
/// without a name (restricted-access courses); those are skipped.
#[derive(Debug, Deserialize)]
pub struct CourseDto {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub course_code: Option<String>,
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentDto {
    pub id: Option<i64>,
    pub name: Option<String>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub has_submitted_submissions: bool,
}
