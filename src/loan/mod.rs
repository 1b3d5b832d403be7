pub mod model;
pub mod rules;
pub mod service;

pub use model::*;
pub use service::{LoanService, RecordedPayment};
