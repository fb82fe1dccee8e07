//! Know-Your-Product review engine: catalog import, comparative grading, and the advisor review
//! workflow that ends in a committed record.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;

pub use config::AppConfig;
pub use error::AppError;
