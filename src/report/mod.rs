pub mod model;
pub mod scope;
pub mod service;

pub use model::*;
pub use scope::ReportScope;
pub use service::ReportService;
