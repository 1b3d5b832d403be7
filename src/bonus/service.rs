use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ensure_valid, ApiError, ApiResult};
use crate::week::Week;

use super::model::{BonusRule, CreateBonusRuleRequest, GroupBonus, UpdateBonusRuleRequest};
use super::rules::{select_bonus, validate_rule};

#[derive(Clone)]
pub struct BonusService {
    db_pool: PgPool,
    timezone: FixedOffset,
}

impl BonusService {
    pub fn new(db_pool: PgPool, timezone: FixedOffset) -> Self {
        Self { db_pool, timezone }
    }

    /// Rules in evaluation order
    pub async fn list_rules(&self) -> ApiResult<Vec<BonusRule>> {
        Ok(
            sqlx::query_as::<_, BonusRule>("SELECT * FROM bonus_rules ORDER BY created_at, id")
                .fetch_all(&self.db_pool)
                .await?,
        )
    }

    pub async fn get_rule(&self, id: Uuid) -> ApiResult<BonusRule> {
        sqlx::query_as::<_, BonusRule>("SELECT * FROM bonus_rules WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Bonus rule", id))
    }

    pub async fn create_rule(&self, request: CreateBonusRuleRequest) -> ApiResult<BonusRule> {
        request.validate()?;
        ensure_valid(validate_rule(
            request.amount,
            request.collection_min,
            request.collection_max,
        ))?;

        let rule = sqlx::query_as::<_, BonusRule>(
            r#"
            INSERT INTO bonus_rules (amount, collection_min, collection_max, max_misses)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(request.amount)
        .bind(request.collection_min)
        .bind(request.collection_max)
        .bind(request.max_misses)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(bonus_rule_id = %rule.id, amount = %rule.amount, "Bonus rule created");
        Ok(rule)
    }

    pub async fn update_rule(&self, id: Uuid, request: UpdateBonusRuleRequest) -> ApiResult<BonusRule> {
        request.validate()?;

        let current = self.get_rule(id).await?;
        let amount = request.amount.unwrap_or(current.amount);
        let collection_min = request.collection_min.unwrap_or(current.collection_min);
        let collection_max = request.collection_max.unwrap_or(current.collection_max);
        ensure_valid(validate_rule(amount, collection_min, collection_max))?;

        let rule = sqlx::query_as::<_, BonusRule>(
            r#"
            UPDATE bonus_rules
            SET amount = $2, collection_min = $3, collection_max = $4, max_misses = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(amount)
        .bind(collection_min)
        .bind(collection_max)
        .bind(request.max_misses.unwrap_or(current.max_misses))
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Bonus rule", id))?;

        tracing::info!(bonus_rule_id = %id, "Bonus rule updated");
        Ok(rule)
    }

    pub async fn delete_rule(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM bonus_rules WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Bonus rule", id));
        }

        tracing::info!(bonus_rule_id = %id, "Bonus rule deleted");
        Ok(())
    }

    /// Bonus earned by a group in the week containing `reference_date`
    pub async fn compute_group_bonus(
        &self,
        group_id: Uuid,
        reference_date: Option<NaiveDate>,
    ) -> ApiResult<GroupBonus> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM groups WHERE id = $1)")
            .bind(group_id)
            .fetch_one(&self.db_pool)
            .await?;
        if !exists {
            return Err(ApiError::not_found("Group", group_id));
        }

        let week = reference_date
            .map(Week::try_containing)
            .transpose()?
            .unwrap_or_else(|| Week::current(&self.timezone));
        let rules = self.list_rules().await?;

        self.group_bonus_for_week(group_id, week, &rules).await
    }

    /// Same as `compute_group_bonus` with the rules already loaded
    pub async fn group_bonus_for_week(
        &self,
        group_id: Uuid,
        week: Week,
        rules: &[BonusRule],
    ) -> ApiResult<GroupBonus> {
        let (from, to) = week.bounds(&self.timezone);

        let collected: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(p.amount), 0)
            FROM payments p
            JOIN loans l ON l.id = p.loan_id
            JOIN borrowers b ON b.id = l.borrower_id
            WHERE b.group_id = $1 AND p.paid_at >= $2 AND p.paid_at < $3
            "#,
        )
        .bind(group_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.db_pool)
        .await?;

        let misses: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM misses m
            JOIN loans l ON l.id = m.loan_id
            JOIN borrowers b ON b.id = l.borrower_id
            WHERE b.group_id = $1 AND m.week_start = $2
            "#,
        )
        .bind(group_id)
        .bind(week.start())
        .fetch_one(&self.db_pool)
        .await?;

        let rule = select_bonus(rules, collected, misses);

        Ok(GroupBonus {
            group_id,
            week_start: week.start(),
            collected,
            misses,
            amount: rule.map(|r| r.amount).unwrap_or(Decimal::ZERO),
            rule_id: rule.map(|r| r.id),
        })
    }
}
