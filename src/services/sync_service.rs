use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::canvas::CanvasClient;
use crate::error::AppError;
use crate::store;
use crate::week::week_key_of;

/// Sync reconciler: merges freshly fetched Canvas records into the store.
/// Inserts new rows, refreshes mutable fields on existing ones, and never
/// touches reminder flags, plans, or completion state.
pub struct SyncService {
    db: SqlitePool,
    canvas: Arc<dyn CanvasClient>,
}

#[derive(Debug, Serialize)]
pub struct SyncStats {
    pub courses_synced: usize,
    pub assignments_synced: usize,
    pub assignments_without_due_date: usize,
}

impl SyncService {
    pub fn new(db: SqlitePool, canvas: Arc<dyn CanvasClient>) -> Self {
        Self { db, canvas }
    }

    /// One full sync pass. A fetch failure aborts the pass before any
    /// mutation for the affected course; courses already reconciled in
    /// this pass keep their fresh data.
    pub async fn sync_all(&self) -> Result<SyncStats, AppError> {
        info!("Starting Canvas sync...");
        let courses = self.canvas.fetch_courses().await?;

        let mut stats = SyncStats {
            courses_synced: 0,
            assignments_synced: 0,
            assignments_without_due_date: 0,
        };

        for course in &courses {
            store::upsert_course(&self.db, course).await?;
            stats.courses_synced += 1;
        }

        for course in &courses {
            let assignments = self.canvas.fetch_assignments(course.id).await?;
            for record in &assignments {
                // Week key is derived from the due instant at sync time;
                // dateless assignments are stored but never evaluated.
                let week_key = record.due_at.map(week_key_of);
                if week_key.is_none() {
                    stats.assignments_without_due_date += 1;
                }
                store::upsert_assignment(&self.db, record, week_key).await?;
                stats.assignments_synced += 1;
            }
        }

        info!(
            "Sync completed: {} courses, {} assignments ({} without due date)",
            stats.courses_synced, stats.assignments_synced, stats.assignments_without_due_date
        );
        Ok(stats)
    }

    /// Run sync on a fixed interval. A failed pass is logged and the loop
    /// continues; the store keeps its last good state.
    pub async fn start_periodic(self, interval: Duration) {
        info!("Starting background sync (interval: {:?})", interval);
        loop {
            tokio::time::sleep(interval).await;
            match self.sync_all().await {
                Ok(stats) => {
                    info!(
                        "Background sync done: {} courses, {} assignments",
                        stats.courses_synced, stats.assignments_synced
                    );
                }
                Err(e) => {
                    warn!("Background sync failed: {:?}", e);
                }
            }
        }
    }
}
