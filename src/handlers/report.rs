use axum::extract::{Query, State};
use std::sync::Arc;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::extract::Json;
use crate::models::ApiResponse;
use crate::report::{GeneralReport, ReportQuery, ReportService};

/// GET /api/reports/general?date=YYYY-MM-DD&route_id=...
///
/// Rows are limited to the groups the caller can see; a row whose figures
/// could not be computed carries an `error` instead.
pub async fn general_report(
    State(service): State<Arc<ReportService>>,
    user: AuthenticatedUser,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ApiResponse<GeneralReport>>, ApiError> {
    Ok(Json(ApiResponse::new(
        service.general_report(&user, query).await?,
    )))
}
