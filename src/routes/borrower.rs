//! Borrower route definitions

use axum::{routing::get, Router};

use crate::handlers::borrower::*;
use crate::state::AppState;

pub fn borrower_routes() -> Router<AppState> {
    Router::new()
        .route("/api/borrowers", get(list_borrowers).post(create_borrower))
        .route("/api/borrowers/guarantors", get(list_guarantors))
        .route("/api/borrowers/catalogs", get(borrower_catalogs))
        .route(
            "/api/borrowers/:id",
            get(get_borrower).put(update_borrower).delete(delete_borrower),
        )
        .route("/api/borrowers/:id/balance", get(borrower_balance))
}
