use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::PaginatedResponse;

use super::model::{
    Borrower, BorrowerBalance, BorrowerFilter, CreateBorrowerRequest, UpdateBorrowerRequest,
};

#[derive(Clone)]
pub struct BorrowerService {
    db_pool: PgPool,
}

impl BorrowerService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn create_borrower(&self, request: CreateBorrowerRequest) -> ApiResult<Borrower> {
        request.validate()?;

        let borrower = sqlx::query_as::<_, Borrower>(
            r#"
            INSERT INTO borrowers (
                first_name, last_name, second_last_name, neighborhood, postal_code,
                voter_id_code, marital_status, children, housing, is_guarantor, group_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.second_last_name)
        .bind(&request.neighborhood)
        .bind(&request.postal_code)
        .bind(&request.voter_id_code)
        .bind(request.marital_status)
        .bind(request.children)
        .bind(request.housing)
        .bind(request.is_guarantor)
        .bind(request.group_id)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(
            borrower_id = %borrower.id,
            group_id = %borrower.group_id,
            is_guarantor = borrower.is_guarantor,
            "Borrower registered"
        );
        Ok(borrower)
    }

    pub async fn get_borrower(&self, id: Uuid) -> ApiResult<Borrower> {
        sqlx::query_as::<_, Borrower>("SELECT * FROM borrowers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Borrower", id))
    }

    pub async fn list_borrowers(
        &self,
        filter: BorrowerFilter,
    ) -> ApiResult<PaginatedResponse<Borrower>> {
        let pagination = filter.pagination();
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let mut query_builder = QueryBuilder::<Postgres>::new("SELECT * FROM borrowers WHERE 1=1");
        let mut count_builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM borrowers WHERE 1=1");

        for builder in [&mut query_builder, &mut count_builder] {
            if let Some(group_id) = filter.group_id {
                builder.push(" AND group_id = ").push_bind(group_id);
            }
            if let Some(is_guarantor) = filter.is_guarantor {
                builder.push(" AND is_guarantor = ").push_bind(is_guarantor);
            }
            if let Some(pattern) = &search {
                builder
                    .push(" AND (first_name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR last_name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR second_last_name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(")");
            }
        }

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        query_builder
            .push(" ORDER BY last_name, first_name, id LIMIT ")
            .push_bind(pagination.per_page())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let items = query_builder
            .build_query_as::<Borrower>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(PaginatedResponse::new(items, pagination, total))
    }

    /// Guarantors, optionally restricted to one group
    pub async fn list_guarantors(&self, group_id: Option<Uuid>) -> ApiResult<Vec<Borrower>> {
        Ok(sqlx::query_as::<_, Borrower>(
            r#"
            SELECT * FROM borrowers
            WHERE is_guarantor AND ($1::uuid IS NULL OR group_id = $1)
            ORDER BY last_name, first_name
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.db_pool)
        .await?)
    }

    pub async fn update_borrower(
        &self,
        id: Uuid,
        request: UpdateBorrowerRequest,
    ) -> ApiResult<Borrower> {
        request.validate()?;

        let borrower = sqlx::query_as::<_, Borrower>(
            r#"
            UPDATE borrowers SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                second_last_name = COALESCE($4, second_last_name),
                neighborhood = COALESCE($5, neighborhood),
                postal_code = COALESCE($6, postal_code),
                voter_id_code = COALESCE($7, voter_id_code),
                marital_status = COALESCE($8, marital_status),
                children = COALESCE($9, children),
                housing = COALESCE($10, housing),
                is_guarantor = COALESCE($11, is_guarantor),
                group_id = COALESCE($12, group_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.second_last_name)
        .bind(&request.neighborhood)
        .bind(&request.postal_code)
        .bind(&request.voter_id_code)
        .bind(request.marital_status)
        .bind(request.children)
        .bind(request.housing)
        .bind(request.is_guarantor)
        .bind(request.group_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Borrower", id))?;

        tracing::info!(borrower_id = %id, "Borrower updated");
        Ok(borrower)
    }

    /// Fails with 400 while loans still reference the borrower
    pub async fn delete_borrower(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM borrowers WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Borrower", id));
        }

        tracing::info!(borrower_id = %id, "Borrower deleted");
        Ok(())
    }

    pub async fn borrower_balance(&self, id: Uuid) -> ApiResult<BorrowerBalance> {
        self.get_borrower(id).await?;

        let balance = sqlx::query_as::<_, BorrowerBalance>(
            r#"
            WITH per_loan AS (
                SELECT
                    l.status,
                    l.disbursed,
                    l.expected_total,
                    COALESCE((SELECT SUM(p.amount) FROM payments p WHERE p.loan_id = l.id), 0) AS paid
                FROM loans l
                WHERE l.borrower_id = $1
            )
            SELECT
                $1::uuid AS borrower_id,
                COALESCE(SUM(disbursed), 0) AS lent,
                COALESCE(SUM(paid), 0) AS paid,
                GREATEST(COALESCE(SUM(expected_total), 0) - COALESCE(SUM(paid), 0), 0) AS remaining,
                COALESCE(SUM(expected_total - paid) FILTER (WHERE status = 'active'), 0) AS paper,
                COALESCE(SUM(disbursed) FILTER (WHERE status = 'active'), 0) AS "real",
                COUNT(*) FILTER (WHERE status = 'active') AS active_loans
            FROM per_loan
            "#,
        )
        .bind(id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(balance)
    }
}
