//! Reminder dispatch engine. A single task polls on a fixed cadence and
//! re-derives everything from the store each tick, so a restart loses no
//! timer state. Per (record, class) the life cycle is `PENDING -> SENT`;
//! a window that passes without a confirmed send is permanently missed.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{DueCandidate, DueReminder, PlanCandidate, PlanReminder};
use crate::notify::{Notifier, NotifyTarget};
use crate::store;
use crate::week::format_local;

pub struct ReminderScheduler {
    db: SqlitePool,
    notifier: Arc<dyn Notifier>,
    tick_interval: StdDuration,
    tolerance: Duration,
    tz: Tz,
}

#[derive(Debug, Default, Serialize)]
pub struct TickStats {
    pub plan_reminders_sent: usize,
    pub due_reminders_sent: usize,
    /// Due classes armed without dispatch because every tracked user had
    /// already completed the assignment.
    pub suppressed: usize,
    pub failures: usize,
}

impl TickStats {
    fn dispatched(&self) -> usize {
        self.plan_reminders_sent + self.due_reminders_sent
    }
}

impl ReminderScheduler {
    pub fn new(
        db: SqlitePool,
        notifier: Arc<dyn Notifier>,
        tick_interval: StdDuration,
        tolerance: Duration,
        tz: Tz,
    ) -> Self {
        Self { db, notifier, tick_interval, tolerance, tz }
    }

    /// Run ticks forever. The loop awaits each tick to completion, so
    /// ticks never overlap; a tick that outruns the interval delays the
    /// next firing instead of stacking.
    pub async fn start(self) {
        info!("Starting reminder scheduler (interval: {:?})", self.tick_interval);
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.tick(Utc::now()).await {
                Ok(stats) if stats.dispatched() > 0 || stats.failures > 0 => {
                    info!(
                        "Tick: {} plan reminders, {} due reminders, {} suppressed, {} failures",
                        stats.plan_reminders_sent,
                        stats.due_reminders_sent,
                        stats.suppressed,
                        stats.failures
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Reminder tick failed: {:?}", e);
                }
            }
        }
    }

    /// One evaluation pass at the given instant. Public and deterministic
    /// in `now` so tests can drive exact window edges.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickStats, AppError> {
        let mut stats = TickStats::default();
        self.plan_reminders(now, &mut stats).await?;
        self.due_reminders(now, &mut stats).await?;
        Ok(stats)
    }

    fn in_window(&self, target: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (target - now).abs() <= self.tolerance
    }

    async fn plan_reminders(
        &self,
        now: DateTime<Utc>,
        stats: &mut TickStats,
    ) -> Result<(), AppError> {
        // Candidates whose planned instant could put any class's target
        // inside this tick's tolerance.
        let from = now - self.tolerance;
        let to = now + PlanReminder::max_lead() + self.tolerance;
        let candidates = store::plans_in_window(&self.db, from, to).await?;

        for plan in &candidates {
            for class in PlanReminder::ALL {
                if plan.sent(class) {
                    continue;
                }
                let target = plan.planned_at - class.lead();
                if !self.in_window(target, now) {
                    continue;
                }

                let message = render_plan_reminder(plan, class, self.tz);
                let recipient = NotifyTarget::User(plan.user_id.clone());
                match self.notifier.notify(&recipient, &message).await {
                    Ok(()) => {
                        // Flag only after a confirmed send. A storage
                        // failure here is logged and skipped so the rest
                        // of the batch still runs.
                        match store::set_plan_flag(&self.db, &plan.key(), class).await {
                            Ok(_) => stats.plan_reminders_sent += 1,
                            Err(e) => {
                                warn!(
                                    "Failed to record {} flag for plan {:?}: {}",
                                    class.label(),
                                    plan.key(),
                                    e
                                );
                                stats.failures += 1;
                            }
                        }
                    }
                    Err(e) => {
                        // Flag stays unset; the next tick retries while
                        // the target is still inside tolerance.
                        warn!(
                            "Dispatch failed for {} on plan {:?}: {}",
                            class.label(),
                            plan.key(),
                            e
                        );
                        stats.failures += 1;
                    }
                }
            }
        }
        Ok(())
    }

    async fn due_reminders(
        &self,
        now: DateTime<Utc>,
        stats: &mut TickStats,
    ) -> Result<(), AppError> {
        let from = now - self.tolerance;
        let to = now + DueReminder::TwoDay.lead() + self.tolerance;
        let candidates = store::assignments_due_between(&self.db, from, to).await?;

        for assignment in &candidates {
            for class in DueReminder::ALL {
                if assignment.sent(class) {
                    continue;
                }
                let target = assignment.due_at - class.lead();
                if !self.in_window(target, now) {
                    continue;
                }

                let counts = match store::tracked_completion_counts(&self.db, assignment.key()).await
                {
                    Ok(counts) => counts,
                    Err(e) => {
                        warn!(
                            "Failed to load completion counts for {:?}: {}",
                            assignment.key(),
                            e
                        );
                        stats.failures += 1;
                        continue;
                    }
                };

                let (tracked, done) = counts;
                if tracked > 0 && done == tracked {
                    // Zero eligible recipients: arm the flag anyway so the
                    // window cannot produce a later false match.
                    match store::set_due_flag(&self.db, assignment.key(), class).await {
                        Ok(_) => stats.suppressed += 1,
                        Err(e) => {
                            warn!("Failed to arm suppressed flag for {:?}: {}", assignment.key(), e);
                            stats.failures += 1;
                        }
                    }
                    continue;
                }

                let message = render_due_reminder(assignment, class, self.tz);
                match self.notifier.notify(&NotifyTarget::Channel, &message).await {
                    Ok(()) => match store::set_due_flag(&self.db, assignment.key(), class).await {
                        Ok(_) => stats.due_reminders_sent += 1,
                        Err(e) => {
                            warn!(
                                "Failed to record {} flag for {:?}: {}",
                                class.label(),
                                assignment.key(),
                                e
                            );
                            stats.failures += 1;
                        }
                    },
                    Err(e) => {
                        warn!(
                            "Dispatch failed for {} on {:?}: {}",
                            class.label(),
                            assignment.key(),
                            e
                        );
                        stats.failures += 1;
                    }
                }
            }
        }
        Ok(())
    }
}

fn course_label(code: &Option<String>, name: &str) -> String {
    match code {
        Some(code) => format!("{code}: {name}"),
        None => name.to_string(),
    }
}

fn render_plan_reminder(plan: &PlanCandidate, class: PlanReminder, tz: Tz) -> String {
    let planned = format_local(plan.planned_at, tz);
    let due = plan
        .due_at
        .map(|d| format_local(d, tz))
        .unwrap_or_else(|| "No due date".to_string());
    let mut message = format!(
        "{} <@{}>\nPlanned work session for: {}\nCourse: {}\nScheduled time: {}\nDue: {}",
        class.label(),
        plan.user_id,
        plan.assignment_name,
        course_label(&plan.course_code, &plan.course_name),
        planned,
        due,
    );
    if let Some(notes) = &plan.notes {
        message.push_str(&format!("\nNotes: {notes}"));
    }
    message
}

fn render_due_reminder(assignment: &DueCandidate, class: DueReminder, tz: Tz) -> String {
    format!(
        "{}\nAssignment due soon: {}\nCourse: {}\nDue: {}\n{}",
        class.label(),
        assignment.name,
        course_label(&assignment.course_code, &assignment.course_name),
        format_local(assignment.due_at, tz),
        class.message(),
    )
}
