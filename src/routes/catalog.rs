//! Group, route and bonus rule definitions

use axum::{routing::get, Router};

use crate::handlers::{bonus, group, route};
use crate::state::AppState;

pub fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/api/groups", get(group::list_groups).post(group::create_group))
        .route(
            "/api/groups/:id",
            get(group::get_group)
                .put(group::update_group)
                .delete(group::delete_group),
        )
        .route("/api/groups/:id/bonus", get(group::group_bonus))
}

pub fn route_routes() -> Router<AppState> {
    Router::new()
        .route("/api/routes", get(route::list_routes).post(route::create_route))
        .route(
            "/api/routes/:id",
            get(route::get_route)
                .put(route::update_route)
                .delete(route::delete_route),
        )
}

pub fn bonus_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/bonuses",
            get(bonus::list_bonus_rules).post(bonus::create_bonus_rule),
        )
        .route(
            "/api/bonuses/:id",
            get(bonus::get_bonus_rule)
                .put(bonus::update_bonus_rule)
                .delete(bonus::delete_bonus_rule),
        )
}
