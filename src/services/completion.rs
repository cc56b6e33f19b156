use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::AppError;
use crate::models::AssignmentKey;
use crate::notify::{Notifier, NotifyTarget};
use crate::store;
use crate::week::{format_local, week_bounds, week_key_of};

/// Records per-user completion and fires the once-per-week celebration
/// when a user's current-week assignments are all done.
pub struct CompletionTracker {
    db: SqlitePool,
    notifier: Arc<dyn Notifier>,
    tz: Tz,
}

impl CompletionTracker {
    pub fn new(db: SqlitePool, notifier: Arc<dyn Notifier>, tz: Tz) -> Self {
        Self { db, notifier, tz }
    }

    /// Idempotent completion upsert. Returns true when this call produced
    /// the week's celebration dispatch.
    pub async fn mark_complete(
        &self,
        user_id: &str,
        key: AssignmentKey,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        if store::find_assignment(&self.db, key).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let completed_at = completed.then_some(now);
        store::set_completed(&self.db, user_id, key, completed, completed_at).await?;

        if !completed {
            return Ok(false);
        }
        self.maybe_celebrate(user_id, now).await
    }

    async fn maybe_celebrate(&self, user_id: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        let week = week_key_of(now);
        let (total, done) = store::week_totals(&self.db, user_id, week).await?;

        // A week with nothing due never celebrates.
        if total == 0 || done < total {
            return Ok(false);
        }
        if store::week_notified(&self.db, user_id, week).await? {
            return Ok(false);
        }

        let message = render_celebration(user_id, total, now, self.tz);
        self.notifier.notify(&NotifyTarget::Channel, &message).await?;
        // Recorded only after the dispatch is confirmed, mirroring the
        // reminder flags.
        store::set_week_notified(&self.db, user_id, week).await?;
        info!("Sent week completion celebration to user {}", user_id);
        Ok(true)
    }
}

fn render_celebration(user_id: &str, total: i64, now: DateTime<Utc>, tz: Tz) -> String {
    let week = week_key_of(now);
    let range = match week_bounds(week) {
        Some((start, end)) => format!(
            "{} - {}",
            format_local(start, tz),
            format_local(end - chrono::Duration::seconds(1), tz)
        ),
        None => week.to_string(),
    };
    format!(
        "Congratulations! <@{user_id}>\nYou've completed all {total} assignment(s) for the week \
         of {range}!\nGreat work staying on top of your coursework. A new week begins on Monday \
         with fresh assignments."
    )
}
