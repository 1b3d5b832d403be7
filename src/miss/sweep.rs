//! Weekly miss sweep
//!
//! Once a week every active loan is checked against the payments it received
//! during the week that just closed. Loans whose weekly total is below the
//! ideal collection get a miss for that week. The `(loan, week)` unique key
//! makes re-runs harmless, and a process-wide lock keeps two sweeps from
//! running at once.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::loan::rules;
use crate::loan::service::insert_miss;
use crate::week::Week;

/// Outcome of one sweep
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub week_start: NaiveDate,
    pub evaluated: usize,
    pub misses_recorded: usize,
    pub failures: usize,
}

#[derive(Debug, sqlx::FromRow)]
struct SweepCandidate {
    id: Uuid,
    principal: Decimal,
    weekly_rate: Decimal,
}

pub struct MissSweeper {
    db_pool: PgPool,
    timezone: FixedOffset,
    running: Mutex<()>,
}

impl MissSweeper {
    pub fn new(db_pool: PgPool, timezone: FixedOffset) -> Self {
        Self {
            db_pool,
            timezone,
            running: Mutex::new(()),
        }
    }

    /// Evaluate the week that ended before the current one
    pub async fn run_previous_week(&self) -> ApiResult<SweepReport> {
        self.run_for_week(Week::current(&self.timezone).previous())
            .await
    }

    /// Evaluate `week`; fails with a conflict when another sweep is in progress
    pub async fn run_for_week(&self, week: Week) -> ApiResult<SweepReport> {
        let _guard = self.running.try_lock().map_err(|_| {
            tracing::warn!(week_start = %week.start(), "Miss sweep already running, skipping");
            ApiError::Conflict("A miss sweep is already running".to_string())
        })?;

        let (from, to) = week.bounds(&self.timezone);

        let candidates = sqlx::query_as::<_, SweepCandidate>(
            r#"
            SELECT l.id, l.principal, t.weekly_rate
            FROM loans l
            JOIN loan_types t ON t.id = l.loan_type_id
            WHERE l.status = 'active' AND l.started_at < $1
            ORDER BY l.id
            "#,
        )
        .bind(to)
        .fetch_all(&self.db_pool)
        .await?;

        tracing::info!(
            week_start = %week.start(),
            loans = candidates.len(),
            "Miss sweep started"
        );

        let mut report = SweepReport {
            week_start: week.start(),
            evaluated: 0,
            misses_recorded: 0,
            failures: 0,
        };

        for candidate in &candidates {
            match self.evaluate(candidate, week, from, to).await {
                Ok(recorded) => {
                    report.evaluated += 1;
                    if recorded {
                        report.misses_recorded += 1;
                    }
                }
                Err(e) => {
                    report.failures += 1;
                    tracing::error!(
                        loan_id = %candidate.id,
                        week_start = %week.start(),
                        error = %e,
                        "Miss sweep failed for loan"
                    );
                }
            }
        }

        tracing::info!(
            week_start = %report.week_start,
            evaluated = report.evaluated,
            misses_recorded = report.misses_recorded,
            failures = report.failures,
            "Miss sweep finished"
        );

        Ok(report)
    }

    /// True when a new miss was written
    async fn evaluate(
        &self,
        candidate: &SweepCandidate,
        week: Week,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ApiResult<bool> {
        let collected: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM payments
            WHERE loan_id = $1 AND paid_at >= $2 AND paid_at < $3
            "#,
        )
        .bind(candidate.id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.db_pool)
        .await?;

        if !rules::week_missed(collected, candidate.principal, candidate.weekly_rate) {
            return Ok(false);
        }

        insert_miss(&self.db_pool, candidate.id, week).await
    }
}

/// Register the weekly sweep with a started scheduler. `cron` has six
/// fields (seconds first) and is evaluated in UTC.
pub async fn schedule_weekly_sweep(
    sweeper: Arc<MissSweeper>,
    cron: &str,
) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(cron, move |_id, _scheduler| {
        let sweeper = sweeper.clone();
        Box::pin(async move {
            if let Err(e) = sweeper.run_previous_week().await {
                tracing::error!(error = %e, "Scheduled miss sweep did not run");
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    tracing::info!(cron = %cron, "Weekly miss sweep scheduled");
    Ok(scheduler)
}
