use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::extract::Json;
use crate::models::{Action, ApiResponse};
use crate::route::{CreateRouteRequest, Route, RouteService, UpdateRouteRequest};

pub async fn create_route(
    State(service): State<Arc<RouteService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateRouteRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Route>>), ApiError> {
    user.require(Action::EditRecords)?;
    let route = service.create_route(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(route))))
}

pub async fn list_routes(
    State(service): State<Arc<RouteService>>,
    _user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<Route>>>, ApiError> {
    Ok(Json(ApiResponse::new(service.list_routes().await?)))
}

pub async fn get_route(
    State(service): State<Arc<RouteService>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Route>>, ApiError> {
    Ok(Json(ApiResponse::new(service.get_route(id).await?)))
}

pub async fn update_route(
    State(service): State<Arc<RouteService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRouteRequest>,
) -> Result<Json<ApiResponse<Route>>, ApiError> {
    user.require(Action::EditRecords)?;
    Ok(Json(ApiResponse::new(service.update_route(id, request).await?)))
}

pub async fn delete_route(
    State(service): State<Arc<RouteService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Action::EditRecords)?;
    service.delete_route(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
