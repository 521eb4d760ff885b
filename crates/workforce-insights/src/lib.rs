//! HR metric aggregation and outlier classification, with a recommendation gateway
//! that always degrades to flagged local suggestions.

pub mod analytics;
pub mod config;
pub mod error;
pub mod recommendations;
pub mod session;
pub mod telemetry;

pub use error::AppError;
