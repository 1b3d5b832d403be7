use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::borrower::Borrower;
use crate::db;
use crate::config::LendingPolicy;
use crate::error::{ensure_valid, ApiError, ApiResult, Violation};
use crate::middleware::AuthenticatedUser;
use crate::models::PaginatedResponse;
use crate::payment::Payment;
use crate::week::Week;

use super::model::{
    CreateLoanRequest, CreateLoanTypeRequest, Loan, LoanFilter, LoanStatus, LoanSummary, LoanType,
    UpdateLoanRequest,
};
use super::rules::{self, LoanApplication, LoanProgress};

/// Result of recording a payment against a loan
#[derive(Debug, Serialize)]
pub struct RecordedPayment {
    pub payment: Payment,
    pub loan: Loan,
    pub covers_week: bool,
    /// A miss was written for the payment's week by this call
    pub miss_recorded: bool,
}

#[derive(Clone)]
pub struct LoanService {
    db_pool: PgPool,
    policy: LendingPolicy,
    timezone: FixedOffset,
}

impl LoanService {
    pub fn new(db_pool: PgPool, policy: LendingPolicy, timezone: FixedOffset) -> Self {
        Self {
            db_pool,
            policy,
            timezone,
        }
    }

    /// Issue a loan, renewing the borrower's current loan when it qualifies
    pub async fn create_loan(
        &self,
        actor: &AuthenticatedUser,
        request: CreateLoanRequest,
    ) -> ApiResult<Loan> {
        let application = LoanApplication {
            borrower_id: request.borrower_id,
            guarantor_id: request.guarantor_id,
            principal: request.principal,
        };
        ensure_valid(rules::validate_application(
            &application,
            actor.role,
            &self.policy,
        ))?;

        let mut tx = self.db_pool.begin().await?;

        let mut lock_keys = vec![request.borrower_id];
        lock_keys.extend(request.guarantor_id);
        db::lock_keys(&mut tx, lock_keys).await?;

        let borrower = fetch_borrower(&mut *tx, request.borrower_id).await?;
        let loan_type = fetch_loan_type(&mut *tx, request.loan_type_id).await?;

        if let Some(guarantor_id) = request.guarantor_id {
            let guarantor = fetch_borrower(&mut *tx, guarantor_id).await?;
            if !guarantor.is_guarantor {
                return Err(ApiError::ValidationError(format!(
                    "Borrower {} is not registered as a guarantor",
                    guarantor_id
                )));
            }

            let already_backing: bool = sqlx::query_scalar(
                r#"
                SELECT EXISTS (
                    SELECT 1
                    FROM loans l
                    JOIN borrowers b ON b.id = l.borrower_id
                    WHERE l.guarantor_id = $1
                      AND l.status = 'active'
                      AND l.borrower_id <> $2
                      AND b.group_id = $3
                )
                "#,
            )
            .bind(guarantor_id)
            .bind(borrower.id)
            .bind(borrower.group_id)
            .fetch_one(&mut *tx)
            .await?;

            if already_backing {
                return Err(ApiError::ValidationError(format!(
                    "Guarantor {} already backs an active loan for another borrower in this group",
                    guarantor_id
                )));
            }
        }

        let current = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE borrower_id = $1 AND status = 'active'
            ORDER BY started_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(borrower.id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut disbursed = request.principal;
        let mut renewed_from = None;

        if let Some(current) = current {
            if !rules::eligible_for_renewal(current.status, current.serviced_weeks, &self.policy) {
                return Err(ApiError::Conflict(format!(
                    "Borrower {} has an active loan with {} serviced weeks; renewal needs {}",
                    borrower.id, current.serviced_weeks, self.policy.renewal_min_weeks
                )));
            }

            let paid = paid_total(&mut *tx, current.id).await?;
            let shortfall = rules::shortfall(current.expected_total, paid);
            disbursed = rules::renewal_disbursement(request.principal, shortfall)
                .map_err(|violation| ApiError::ValidationError(violation.to_string()))?;

            sqlx::query(
                r#"
                UPDATE loans
                SET status = 'completed', completed = TRUE, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(current.id)
            .execute(&mut *tx)
            .await?;

            tracing::info!(
                loan_id = %current.id,
                borrower_id = %borrower.id,
                %shortfall,
                "Loan closed by renewal"
            );
            renewed_from = Some(current.id);
        }

        let expected_total =
            rules::expected_total(request.principal, loan_type.term_weeks, loan_type.weekly_rate);

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (
                borrower_id, guarantor_id, loan_type_id, principal, disbursed,
                expected_total, started_at, status, is_renewal, renewed_from, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(borrower.id)
        .bind(request.guarantor_id)
        .bind(loan_type.id)
        .bind(request.principal)
        .bind(disbursed)
        .bind(expected_total)
        .bind(request.started_at.unwrap_or_else(Utc::now))
        .bind(LoanStatus::Active)
        .bind(renewed_from.is_some())
        .bind(renewed_from)
        .bind(actor.user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            loan_id = %loan.id,
            borrower_id = %loan.borrower_id,
            principal = %loan.principal,
            disbursed = %loan.disbursed,
            renewal = loan.is_renewal,
            created_by = %actor.user_id,
            "Loan created"
        );

        Ok(loan)
    }

    /// Record a collection; updates the serviced-week counter, completion and
    /// the week's miss in the same transaction
    pub async fn record_payment(
        &self,
        actor: &AuthenticatedUser,
        loan_id: Uuid,
        amount: Decimal,
        paid_at: Option<DateTime<Utc>>,
    ) -> ApiResult<RecordedPayment> {
        let mut violations = Vec::new();
        if amount <= Decimal::ZERO {
            violations.push(Violation::new("amount", "must be greater than 0"));
        }
        if amount.normalize().scale() > 2 {
            violations.push(Violation::new("amount", "must have at most two decimals"));
        }
        ensure_valid(violations)?;

        let paid_at = paid_at.unwrap_or_else(Utc::now);
        let paid_week = Week::try_containing_instant(paid_at, &self.timezone)?;
        let mut tx = self.db_pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(loan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Loan", loan_id))?;

        if loan.status != LoanStatus::Active {
            return Err(ApiError::ValidationError(format!(
                "Loan {} is not active",
                loan_id
            )));
        }

        let loan_type = fetch_loan_type(&mut *tx, loan.loan_type_id).await?;
        let progress = LoanProgress {
            principal: loan.principal,
            weekly_rate: loan_type.weekly_rate,
            term_weeks: loan_type.term_weeks,
            expected_total: loan.expected_total,
            serviced_weeks: loan.serviced_weeks,
            paid_total: paid_total(&mut *tx, loan.id).await?,
        };
        let outcome = rules::apply_payment(&progress, amount);

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (loan_id, amount, paid_at, recorded_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(loan.id)
        .bind(amount)
        .bind(paid_at)
        .bind(actor.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut miss_recorded = false;
        if !outcome.covers_week {
            miss_recorded = insert_miss(&mut *tx, loan.id, paid_week).await?;
        }

        let status = if outcome.completed {
            LoanStatus::Completed
        } else {
            LoanStatus::Active
        };

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET serviced_weeks = $1, completed = $2, status = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(outcome.serviced_weeks)
        .bind(outcome.completed)
        .bind(status)
        .bind(loan.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            loan_id = %loan.id,
            payment_id = %payment.id,
            amount = %amount,
            covers_week = outcome.covers_week,
            miss_recorded,
            serviced_weeks = loan.serviced_weeks,
            completed = loan.completed,
            "Payment recorded"
        );

        Ok(RecordedPayment {
            payment,
            loan,
            covers_week: outcome.covers_week,
            miss_recorded,
        })
    }

    pub async fn get_loan(&self, id: Uuid) -> ApiResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Loan", id))
    }

    pub async fn list_loans(&self, filter: LoanFilter) -> ApiResult<PaginatedResponse<Loan>> {
        let pagination = filter.pagination();

        let mut query_builder = QueryBuilder::<Postgres>::new(
            "SELECT l.* FROM loans l JOIN borrowers b ON b.id = l.borrower_id WHERE 1=1",
        );
        let mut count_builder = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM loans l JOIN borrowers b ON b.id = l.borrower_id WHERE 1=1",
        );

        for builder in [&mut query_builder, &mut count_builder] {
            if let Some(borrower_id) = filter.borrower_id {
                builder.push(" AND l.borrower_id = ").push_bind(borrower_id);
            }
            if let Some(group_id) = filter.group_id {
                builder.push(" AND b.group_id = ").push_bind(group_id);
            }
            if let Some(status) = filter.status {
                builder.push(" AND l.status = ").push_bind(status);
            }
        }

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        query_builder
            .push(" ORDER BY l.started_at DESC, l.id LIMIT ")
            .push_bind(pagination.per_page())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let items = query_builder
            .build_query_as::<Loan>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(PaginatedResponse::new(items, pagination, total))
    }

    pub async fn loan_summary(&self, id: Uuid) -> ApiResult<LoanSummary> {
        let loan = self.get_loan(id).await?;
        let loan_type = fetch_loan_type(&self.db_pool, loan.loan_type_id).await?;

        let (paid_total, payments): (Decimal, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0), COUNT(*) FROM payments WHERE loan_id = $1",
        )
        .bind(id)
        .fetch_one(&self.db_pool)
        .await?;

        let misses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM misses WHERE loan_id = $1")
            .bind(id)
            .fetch_one(&self.db_pool)
            .await?;

        Ok(LoanSummary {
            ideal_weekly: rules::ideal_weekly(loan.principal, loan_type.weekly_rate),
            remaining: rules::shortfall(loan.expected_total, paid_total),
            paid_total,
            payments,
            misses,
            loan,
            loan_type,
        })
    }

    pub async fn update_loan(&self, id: Uuid, request: UpdateLoanRequest) -> ApiResult<Loan> {
        let mut violations = Vec::new();
        for (field, value) in [
            ("principal", request.principal),
            ("disbursed", request.disbursed),
            ("expected_total", request.expected_total),
        ] {
            if matches!(value, Some(v) if v <= Decimal::ZERO) {
                violations.push(Violation::new(field, "must be greater than 0"));
            }
        }
        if matches!(request.serviced_weeks, Some(w) if w < 0) {
            violations.push(Violation::new("serviced_weeks", "must not be negative"));
        }
        ensure_valid(violations)?;

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET
                guarantor_id = COALESCE($2, guarantor_id),
                loan_type_id = COALESCE($3, loan_type_id),
                principal = COALESCE($4, principal),
                disbursed = COALESCE($5, disbursed),
                expected_total = COALESCE($6, expected_total),
                started_at = COALESCE($7, started_at),
                status = COALESCE($8, status),
                completed = COALESCE($9, completed),
                serviced_weeks = COALESCE($10, serviced_weeks),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.guarantor_id)
        .bind(request.loan_type_id)
        .bind(request.principal)
        .bind(request.disbursed)
        .bind(request.expected_total)
        .bind(request.started_at)
        .bind(request.status)
        .bind(request.completed)
        .bind(request.serviced_weeks)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Loan", id))?;

        tracing::info!(loan_id = %id, "Loan updated");
        Ok(loan)
    }

    /// Hard delete; payments and misses go with it
    pub async fn delete_loan(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Loan", id));
        }

        tracing::warn!(loan_id = %id, "Loan deleted");
        Ok(())
    }

    pub async fn list_loan_types(&self) -> ApiResult<Vec<LoanType>> {
        Ok(
            sqlx::query_as::<_, LoanType>("SELECT * FROM loan_types ORDER BY name")
                .fetch_all(&self.db_pool)
                .await?,
        )
    }

    pub async fn get_loan_type(&self, id: Uuid) -> ApiResult<LoanType> {
        fetch_loan_type(&self.db_pool, id).await
    }

    pub async fn create_loan_type(&self, request: CreateLoanTypeRequest) -> ApiResult<LoanType> {
        let mut violations = Vec::new();
        if request.weekly_rate <= Decimal::ZERO || request.weekly_rate >= Decimal::ONE {
            violations.push(Violation::new("weekly_rate", "must be between 0 and 1"));
        }
        if request.miss_penalty < Decimal::ZERO {
            violations.push(Violation::new("miss_penalty", "must not be negative"));
        }
        ensure_valid(violations)?;

        let loan_type = sqlx::query_as::<_, LoanType>(
            r#"
            INSERT INTO loan_types (name, term_weeks, weekly_rate, tolerated_misses, miss_penalty, penalty_limit)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(request.term_weeks)
        .bind(request.weekly_rate)
        .bind(request.tolerated_misses)
        .bind(request.miss_penalty)
        .bind(request.penalty_limit)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(loan_type_id = %loan_type.id, name = %loan_type.name, "Loan type created");
        Ok(loan_type)
    }
}

async fn fetch_borrower<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> ApiResult<Borrower> {
    sqlx::query_as::<_, Borrower>("SELECT * FROM borrowers WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| ApiError::not_found("Borrower", id))
}

pub(crate) async fn fetch_loan_type<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> ApiResult<LoanType> {
    sqlx::query_as::<_, LoanType>("SELECT * FROM loan_types WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| ApiError::not_found("Loan type", id))
}

async fn paid_total<'e, E: PgExecutor<'e>>(executor: E, loan_id: Uuid) -> ApiResult<Decimal> {
    Ok(
        sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM payments WHERE loan_id = $1")
            .bind(loan_id)
            .fetch_one(executor)
            .await?,
    )
}

/// Insert the miss for `(loan, week)` unless it exists; true when inserted
pub(crate) async fn insert_miss<'e, E: PgExecutor<'e>>(
    executor: E,
    loan_id: Uuid,
    week: Week,
) -> ApiResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO misses (loan_id, week_start)
        VALUES ($1, $2)
        ON CONFLICT (loan_id, week_start) DO NOTHING
        "#,
    )
    .bind(loan_id)
    .bind(week.start())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}
