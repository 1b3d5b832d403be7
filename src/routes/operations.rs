//! Cut and report route definitions

use axum::{routing::get, Router};

use crate::handlers::{cut, report};
use crate::state::AppState;

pub fn cut_routes() -> Router<AppState> {
    Router::new()
        .route("/api/cuts", get(cut::list_cuts).post(cut::create_cut))
        .route("/api/cuts/summary", get(cut::cut_summary))
        .route(
            "/api/cuts/:id",
            get(cut::get_cut).put(cut::update_cut).delete(cut::delete_cut),
        )
}

pub fn report_routes() -> Router<AppState> {
    Router::new().route("/api/reports/general", get(report::general_report))
}
