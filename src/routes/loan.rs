//! Loan, payment and miss route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{loan, miss, payment};
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/loan-types",
            get(loan::list_loan_types).post(loan::create_loan_type),
        )
        .route("/api/loan-types/:id", get(loan::get_loan_type))
        .route("/api/loans", get(loan::list_loans).post(loan::create_loan))
        .route(
            "/api/loans/:id",
            get(loan::get_loan)
                .put(loan::update_loan)
                .delete(loan::delete_loan),
        )
        .route("/api/loans/:id/summary", get(loan::loan_summary))
        .route("/api/loans/:id/payments", get(payment::loan_payments))
}

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/payments",
            get(payment::list_payments).post(payment::record_payment),
        )
        .route(
            "/api/payments/:id",
            get(payment::get_payment)
                .put(payment::update_payment)
                .delete(payment::delete_payment),
        )
}

pub fn miss_routes() -> Router<AppState> {
    Router::new()
        .route("/api/misses", get(miss::list_misses).post(miss::create_miss))
        .route("/api/misses/sweep", post(miss::run_sweep))
        .route(
            "/api/misses/:id",
            get(miss::get_miss)
                .put(miss::update_miss)
                .delete(miss::delete_miss),
        )
}
