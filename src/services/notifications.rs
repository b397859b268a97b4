//! Reminder and follow-up messages, sent once a day per business.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use tokio::task::JoinHandle;

use crate::models::{Business, ScheduledVisit};
use crate::state::AppState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Job {
    /// Evening before the visit.
    Reminder,
    /// Morning after the visit.
    FollowUp,
}

impl Job {
    pub fn name(self) -> &'static str {
        match self {
            Job::Reminder => "reminder",
            Job::FollowUp => "follow-up",
        }
    }

    /// The visit date this job covers, as a calendar day in `tz`.
    pub fn target_date(self, tz: Tz, now: DateTime<Utc>) -> NaiveDate {
        let today = now.with_timezone(&tz).date_naive();
        let target = match self {
            Job::Reminder => today.checked_add_days(Days::new(1)),
            Job::FollowUp => today.checked_sub_days(Days::new(1)),
        };
        target.unwrap_or(today)
    }

    pub fn render(self, visit: &ScheduledVisit, business: &Business) -> String {
        match self {
            Job::Reminder => format!(
                "Hala {}! 🌟\nJust a friendly reminder about your appointment with {} tomorrow at {}.\nWe look forward to seeing you! Inshallah.",
                visit.name, business.name, visit.time
            ),
            Job::FollowUp => format!(
                "Ahlan {}! 👋\nWe hope your visit to {} yesterday went well. If you have any questions or need further assistance, please let us know. Take care!",
                visit.name, business.name
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub businesses: usize,
    pub sent: usize,
    pub failed: usize,
}

pub async fn send_reminders(state: &AppState, now: DateTime<Utc>) -> DispatchReport {
    run_job(state, Job::Reminder, now).await
}

pub async fn send_follow_ups(state: &AppState, now: DateTime<Utc>) -> DispatchReport {
    run_job(state, Job::FollowUp, now).await
}

/// Sends `job` to every booking on each business's target date. A failing
/// business or recipient is logged and skipped.
pub async fn run_job(state: &AppState, job: Job, now: DateTime<Utc>) -> DispatchReport {
    let mut report = DispatchReport::default();

    let businesses = match state.registry.list() {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, job = job.name(), "failed to list businesses");
            return report;
        }
    };

    for business in &businesses {
        report.businesses += 1;
        let date = job.target_date(business.tz(), now).format("%Y-%m-%d").to_string();

        let visits = match state
            .appointments
            .get_appointments_by_date(&business.sheet_id, &date)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    business = %business.name,
                    job = job.name(),
                    "skipping business"
                );
                continue;
            }
        };

        for visit in &visits {
            let body = job.render(visit, business);
            match state.messaging.send_message(&visit.phone, &body).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        error = %e,
                        business = %business.name,
                        to = %visit.phone,
                        job = job.name(),
                        "notification failed"
                    );
                }
            }
        }
    }

    tracing::info!(
        job = job.name(),
        businesses = report.businesses,
        sent = report.sent,
        failed = report.failed,
        "dispatch finished"
    );
    report
}

/// Parses both schedules up front, then runs each job on its own task.
pub fn spawn_scheduler(state: Arc<AppState>) -> anyhow::Result<Vec<JoinHandle<()>>> {
    let tz = state.config.scheduler_timezone;
    let jobs = [
        (Job::Reminder, state.config.reminder_cron.clone()),
        (Job::FollowUp, state.config.follow_up_cron.clone()),
    ];

    let mut handles = Vec::with_capacity(jobs.len());
    for (job, expr) in jobs {
        let schedule = Schedule::from_str(&expr)
            .map_err(|e| anyhow::anyhow!("invalid {} cron {expr:?}: {e}", job.name()))?;
        tracing::info!(job = job.name(), cron = %expr, timezone = %tz, "scheduled");
        handles.push(tokio::spawn(run_schedule(Arc::clone(&state), job, schedule, tz)));
    }
    Ok(handles)
}

async fn run_schedule(state: Arc<AppState>, job: Job, schedule: Schedule, tz: Tz) {
    loop {
        let Some(next) = schedule.upcoming(tz).next() else {
            tracing::warn!(job = job.name(), "schedule has no future firings");
            return;
        };
        let wait = (next.with_timezone(&Utc) - Utc::now())
            .to_std()
            .unwrap_or_default();
        tokio::time::sleep(wait).await;

        run_job(&state, job, Utc::now()).await;
    }
}
