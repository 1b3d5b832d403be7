//! Route definitions for the collection API

mod auth;
mod borrower;
mod catalog;
mod loan;
mod operations;
mod user;

pub use auth::auth_routes;
pub use borrower::borrower_routes;
pub use catalog::{bonus_routes, group_routes, route_routes};
pub use loan::{loan_routes, miss_routes, payment_routes};
pub use operations::{cut_routes, report_routes};
pub use user::user_routes;
