use chrono::FixedOffset;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::PaginatedResponse;
use crate::week::Week;

use super::model::{CreateMissRequest, Miss, MissFilter, UpdateMissRequest};

#[derive(Clone)]
pub struct MissService {
    db_pool: PgPool,
    timezone: FixedOffset,
}

impl MissService {
    pub fn new(db_pool: PgPool, timezone: FixedOffset) -> Self {
        Self { db_pool, timezone }
    }

    /// Manual miss; a second one for the same loan and week is a conflict
    pub async fn create_miss(&self, request: CreateMissRequest) -> ApiResult<Miss> {
        let week = request
            .date
            .map(Week::try_containing)
            .transpose()?
            .unwrap_or_else(|| Week::current(&self.timezone));

        let miss = sqlx::query_as::<_, Miss>(
            "INSERT INTO misses (loan_id, week_start) VALUES ($1, $2) RETURNING *",
        )
        .bind(request.loan_id)
        .bind(week.start())
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::Conflict(format!(
                "Loan {} already has a miss for the week of {}",
                request.loan_id,
                week.start()
            )),
            other => other,
        })?;

        tracing::info!(loan_id = %miss.loan_id, week_start = %miss.week_start, "Miss recorded manually");
        Ok(miss)
    }

    pub async fn get_miss(&self, id: Uuid) -> ApiResult<Miss> {
        sqlx::query_as::<_, Miss>("SELECT * FROM misses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Miss", id))
    }

    pub async fn list_misses(&self, filter: MissFilter) -> ApiResult<PaginatedResponse<Miss>> {
        let pagination = filter.pagination();

        let week_start = filter
            .week_of
            .map(Week::try_containing)
            .transpose()?
            .map(|week| week.start());

        let base = "FROM misses m \
                    JOIN loans l ON l.id = m.loan_id \
                    JOIN borrowers b ON b.id = l.borrower_id \
                    WHERE 1=1";
        let mut query_builder = QueryBuilder::<Postgres>::new(format!("SELECT m.* {}", base));
        let mut count_builder = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) {}", base));

        for builder in [&mut query_builder, &mut count_builder] {
            if let Some(loan_id) = filter.loan_id {
                builder.push(" AND m.loan_id = ").push_bind(loan_id);
            }
            if let Some(group_id) = filter.group_id {
                builder.push(" AND b.group_id = ").push_bind(group_id);
            }
            if let Some(start) = week_start {
                builder.push(" AND m.week_start = ").push_bind(start);
            }
        }

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        query_builder
            .push(" ORDER BY m.week_start DESC, m.id LIMIT ")
            .push_bind(pagination.per_page())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let items = query_builder
            .build_query_as::<Miss>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(PaginatedResponse::new(items, pagination, total))
    }

    /// Move a miss to another week
    pub async fn update_miss(&self, id: Uuid, request: UpdateMissRequest) -> ApiResult<Miss> {
        let week = Week::try_containing(request.date)?;
        let miss = sqlx::query_as::<_, Miss>(
            "UPDATE misses SET week_start = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(week.start())
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Miss", id))?;

        tracing::info!(miss_id = %id, week_start = %miss.week_start, "Miss corrected");
        Ok(miss)
    }

    pub async fn delete_miss(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM misses WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Miss", id));
        }

        tracing::warn!(miss_id = %id, "Miss deleted");
        Ok(())
    }
}
