use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

use crate::bonus::BonusService;
use crate::error::{ensure_valid, ApiError, ApiResult};
use crate::middleware::AuthenticatedUser;
use crate::models::{Action, PaginatedResponse};
use crate::report::{ReportQuery, ReportService};
use crate::week::Week;

use super::model::{
    validate_amounts, CreateCutRequest, Cut, CutFilter, CutSummary, UpdateCutRequest,
};

#[derive(Clone)]
pub struct CutService {
    db_pool: PgPool,
    report_service: Arc<ReportService>,
    bonus_service: Arc<BonusService>,
    timezone: FixedOffset,
}

impl CutService {
    pub fn new(
        db_pool: PgPool,
        report_service: Arc<ReportService>,
        bonus_service: Arc<BonusService>,
        timezone: FixedOffset,
    ) -> Self {
        Self {
            db_pool,
            report_service,
            bonus_service,
            timezone,
        }
    }

    fn today(&self) -> NaiveDate {
        chrono::Utc::now().with_timezone(&self.timezone).date_naive()
    }

    pub async fn create_cut(&self, actor: &AuthenticatedUser, request: CreateCutRequest) -> ApiResult<Cut> {
        ensure_valid(validate_amounts(
            Some(request.total_collected),
            Some(request.total_expenses),
            Some(request.seed),
        ))?;

        let cut = sqlx::query_as::<_, Cut>(
            r#"
            INSERT INTO cuts (user_id, cut_date, total_collected, total_expenses, seed)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(actor.user_id)
        .bind(request.cut_date.unwrap_or_else(|| self.today()))
        .bind(request.total_collected)
        .bind(request.total_expenses)
        .bind(request.seed)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(
            cut_id = %cut.id,
            user_id = %cut.user_id,
            total_collected = %cut.total_collected,
            "Cut recorded"
        );
        Ok(cut)
    }

    /// Users without report access only see their own cuts
    pub async fn get_cut(&self, actor: &AuthenticatedUser, id: Uuid) -> ApiResult<Cut> {
        let cut = sqlx::query_as::<_, Cut>("SELECT * FROM cuts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Cut", id))?;

        if cut.user_id != actor.user_id && !actor.can(Action::ViewRouteReports) {
            return Err(ApiError::not_found("Cut", id));
        }
        Ok(cut)
    }

    pub async fn list_cuts(
        &self,
        actor: &AuthenticatedUser,
        mut filter: CutFilter,
    ) -> ApiResult<PaginatedResponse<Cut>> {
        if !actor.can(Action::ViewRouteReports) {
            filter.user_id = Some(actor.user_id);
        }
        let pagination = filter.pagination();

        let mut query_builder = QueryBuilder::<Postgres>::new("SELECT * FROM cuts WHERE 1=1");
        let mut count_builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM cuts WHERE 1=1");

        for builder in [&mut query_builder, &mut count_builder] {
            if let Some(user_id) = filter.user_id {
                builder.push(" AND user_id = ").push_bind(user_id);
            }
            if let Some(from) = filter.from {
                builder.push(" AND cut_date >= ").push_bind(from);
            }
            if let Some(to) = filter.to {
                builder.push(" AND cut_date <= ").push_bind(to);
            }
        }

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        query_builder
            .push(" ORDER BY cut_date DESC, created_at DESC LIMIT ")
            .push_bind(pagination.per_page())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let items = query_builder
            .build_query_as::<Cut>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(PaginatedResponse::new(items, pagination, total))
    }

    pub async fn update_cut(&self, id: Uuid, request: UpdateCutRequest) -> ApiResult<Cut> {
        ensure_valid(validate_amounts(
            request.total_collected,
            request.total_expenses,
            request.seed,
        ))?;

        let cut = sqlx::query_as::<_, Cut>(
            r#"
            UPDATE cuts SET
                total_collected = COALESCE($2, total_collected),
                total_expenses = COALESCE($3, total_expenses),
                seed = COALESCE($4, seed),
                cut_date = COALESCE($5, cut_date)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.total_collected)
        .bind(request.total_expenses)
        .bind(request.seed)
        .bind(request.cut_date)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Cut", id))?;

        tracing::info!(cut_id = %id, "Cut updated");
        Ok(cut)
    }

    pub async fn delete_cut(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM cuts WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Cut", id));
        }

        tracing::warn!(cut_id = %id, "Cut deleted");
        Ok(())
    }

    /// Surplus over the user's visible groups plus the bonus of the groups
    /// they lead, for the week containing `date`
    pub async fn summary(&self, actor: &AuthenticatedUser, date: Option<NaiveDate>) -> ApiResult<CutSummary> {
        let week = Week::try_containing(date.unwrap_or_else(|| self.today()))?;

        let report = self
            .report_service
            .general_report(
                actor,
                ReportQuery {
                    date: Some(week.start()),
                    route_id: None,
                },
            )
            .await?;

        let led: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM groups WHERE lead_user_id = $1")
            .bind(actor.user_id)
            .fetch_all(&self.db_pool)
            .await?;

        let rules = self.bonus_service.list_rules().await?;
        let mut lead_bonus = Decimal::ZERO;
        for group_id in &led {
            lead_bonus += self
                .bonus_service
                .group_bonus_for_week(*group_id, week, &rules)
                .await?
                .amount;
        }

        let (cuts_in_week, collected_in_week): (i64, Decimal) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(total_collected), 0)
            FROM cuts
            WHERE user_id = $1 AND cut_date >= $2 AND cut_date <= $3
            "#,
        )
        .bind(actor.user_id)
        .bind(week.start())
        .bind(week.end())
        .fetch_one(&self.db_pool)
        .await?;

        Ok(CutSummary {
            user_id: actor.user_id,
            week_start: week.start(),
            surplus: report.totals.surplus,
            lead_bonus,
            groups_led: led.len(),
            failed_rows: report.totals.failed_rows,
            cuts_in_week,
            collected_in_week,
        })
    }
}
