use chrono::FixedOffset;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::bonus::{BonusRule, BonusService};
use crate::error::ApiResult;
use crate::middleware::AuthenticatedUser;
use crate::week::Week;

use super::model::{
    GeneralReport, GroupAggregates, GroupFigures, ReportGroup, ReportQuery, ReportRow,
    ReportTotals,
};
use super::scope::ReportScope;

#[derive(Clone)]
pub struct ReportService {
    db_pool: PgPool,
    bonus_service: Arc<BonusService>,
    timezone: FixedOffset,
}

impl ReportService {
    pub fn new(db_pool: PgPool, bonus_service: Arc<BonusService>, timezone: FixedOffset) -> Self {
        Self {
            db_pool,
            bonus_service,
            timezone,
        }
    }

    /// Per-group collection report for the week, limited to what `actor` may see
    pub async fn general_report(
        &self,
        actor: &AuthenticatedUser,
        query: ReportQuery,
    ) -> ApiResult<GeneralReport> {
        let week = query
            .date
            .map(Week::try_containing)
            .transpose()?
            .unwrap_or_else(|| Week::current(&self.timezone));
        let scope = ReportScope::for_user(actor.user_id, actor.role);

        let groups = scope.filter(self.report_groups(query.route_id).await?);
        let rules = self.bonus_service.list_rules().await?;

        let mut rows = Vec::with_capacity(groups.len());
        for group in groups {
            match self.group_figures(group.group_id, week, &rules).await {
                Ok(figures) => rows.push(ReportRow::computed(group, figures)),
                Err(e) => {
                    tracing::error!(
                        group_id = %group.group_id,
                        week_start = %week.start(),
                        error = %e,
                        "Report row could not be computed"
                    );
                    rows.push(ReportRow::failed(group, e.public_message()));
                }
            }
        }

        let totals = ReportTotals::from_rows(&rows);
        tracing::debug!(
            user_id = %actor.user_id,
            role = actor.role.as_str(),
            rows = rows.len(),
            failed_rows = totals.failed_rows,
            "General report built"
        );

        Ok(GeneralReport {
            week_start: week.start(),
            rows,
            totals,
        })
    }

    async fn report_groups(&self, route_id: Option<Uuid>) -> ApiResult<Vec<ReportGroup>> {
        Ok(sqlx::query_as::<_, ReportGroup>(
            r#"
            SELECT
                g.id AS group_id,
                g.name AS group_name,
                r.id AS route_id,
                r.name AS route_name,
                g.lead_user_id,
                lead.first_name || ' ' || lead.last_name AS lead_name,
                r.manager_id,
                manager.first_name || ' ' || manager.last_name AS manager_name,
                r.supervisor_id,
                supervisor.first_name || ' ' || supervisor.last_name AS supervisor_name
            FROM groups g
            JOIN routes r ON r.id = g.route_id
            LEFT JOIN users lead ON lead.id = g.lead_user_id
            LEFT JOIN users manager ON manager.id = r.manager_id
            LEFT JOIN users supervisor ON supervisor.id = r.supervisor_id
            WHERE ($1::uuid IS NULL OR r.id = $1)
            ORDER BY r.name, g.name
            "#,
        )
        .bind(route_id)
        .fetch_all(&self.db_pool)
        .await?)
    }

    async fn group_figures(
        &self,
        group_id: Uuid,
        week: Week,
        rules: &[BonusRule],
    ) -> ApiResult<GroupFigures> {
        let (from, to) = week.bounds(&self.timezone);

        let aggregates = sqlx::query_as::<_, GroupAggregates>(
            r#"
            SELECT
                COALESCE(SUM(ROUND(l.principal * t.weekly_rate, 2)) FILTER (WHERE l.status = 'active'), 0)
                    AS ideal_collection,
                COALESCE(SUM(l.disbursed) FILTER (WHERE l.status = 'active'), 0) AS loan_real,
                COALESCE(SUM(l.expected_total - COALESCE(paid.total, 0)) FILTER (WHERE l.status = 'active'), 0)
                    AS loan_paper,
                COUNT(*) FILTER (WHERE l.status = 'active') AS active_loans,
                COALESCE(SUM(l.disbursed) FILTER (WHERE l.started_at >= $2 AND l.started_at < $3), 0)
                    AS disbursed_in_week
            FROM loans l
            JOIN loan_types t ON t.id = l.loan_type_id
            JOIN borrowers b ON b.id = l.borrower_id
            LEFT JOIN LATERAL (
                SELECT SUM(p.amount) AS total FROM payments p WHERE p.loan_id = l.id
            ) paid ON TRUE
            WHERE b.group_id = $1
            "#,
        )
        .bind(group_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.db_pool)
        .await?;

        let bonus = self
            .bonus_service
            .group_bonus_for_week(group_id, week, rules)
            .await?;

        Ok(GroupFigures::new(aggregates, bonus.collected, bonus.amount))
    }
}
