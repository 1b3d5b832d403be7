use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{ensure_valid, ApiError, ApiResult, Violation};
use crate::models::PaginatedResponse;

use super::model::{Payment, PaymentFilter, UpdatePaymentRequest};

/// Read side and administrative corrections for payments. New payments go
/// through `LoanService::record_payment`.
#[derive(Clone)]
pub struct PaymentService {
    db_pool: PgPool,
}

impl PaymentService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn get_payment(&self, id: Uuid) -> ApiResult<Payment> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Payment", id))
    }

    pub async fn list_payments(
        &self,
        filter: PaymentFilter,
    ) -> ApiResult<PaginatedResponse<Payment>> {
        let pagination = filter.pagination();

        let base = "FROM payments p \
                    JOIN loans l ON l.id = p.loan_id \
                    JOIN borrowers b ON b.id = l.borrower_id \
                    WHERE 1=1";
        let mut query_builder = QueryBuilder::<Postgres>::new(format!("SELECT p.* {}", base));
        let mut count_builder = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) {}", base));

        for builder in [&mut query_builder, &mut count_builder] {
            if let Some(loan_id) = filter.loan_id {
                builder.push(" AND p.loan_id = ").push_bind(loan_id);
            }
            if let Some(group_id) = filter.group_id {
                builder.push(" AND b.group_id = ").push_bind(group_id);
            }
            if let Some(from) = filter.from {
                builder.push(" AND p.paid_at >= ").push_bind(from);
            }
            if let Some(to) = filter.to {
                builder.push(" AND p.paid_at < ").push_bind(to);
            }
        }

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        query_builder
            .push(" ORDER BY p.paid_at DESC, p.id LIMIT ")
            .push_bind(pagination.per_page())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let items = query_builder
            .build_query_as::<Payment>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(PaginatedResponse::new(items, pagination, total))
    }

    /// All payments of one loan, oldest first
    pub async fn payments_for_loan(&self, loan_id: Uuid) -> ApiResult<Vec<Payment>> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM loans WHERE id = $1)")
            .bind(loan_id)
            .fetch_one(&self.db_pool)
            .await?;
        if !exists {
            return Err(ApiError::not_found("Loan", loan_id));
        }

        Ok(sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE loan_id = $1 ORDER BY paid_at, id",
        )
        .bind(loan_id)
        .fetch_all(&self.db_pool)
        .await?)
    }

    /// Corrects the row only; serviced weeks and misses are left as recorded
    pub async fn update_payment(&self, id: Uuid, request: UpdatePaymentRequest) -> ApiResult<Payment> {
        if let Some(amount) = request.amount {
            if amount <= Decimal::ZERO {
                ensure_valid(vec![Violation::new("amount", "must be greater than 0")])?;
            }
        }

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments SET
                amount = COALESCE($2, amount),
                paid_at = COALESCE($3, paid_at)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.amount)
        .bind(request.paid_at)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Payment", id))?;

        tracing::info!(payment_id = %id, loan_id = %payment.loan_id, "Payment corrected");
        Ok(payment)
    }

    pub async fn delete_payment(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Payment", id));
        }

        tracing::warn!(payment_id = %id, "Payment deleted");
        Ok(())
    }
}
