//! API handlers for the collection server

pub mod auth;
pub mod bonus;
pub mod borrower;
pub mod cut;
pub mod group;
pub mod health;
pub mod loan;
pub mod miss;
pub mod payment;
pub mod report;
pub mod route;
pub mod user;

// Re-export the extractors from middleware for handler use
pub use crate::middleware::{AdminUser, AuthenticatedUser};
