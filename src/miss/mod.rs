pub mod model;
pub mod service;
pub mod sweep;

pub use model::*;
pub use service::MissService;
pub use sweep::{schedule_weekly_sweep, MissSweeper, SweepReport};
