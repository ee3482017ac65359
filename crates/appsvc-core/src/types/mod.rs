//! Type definitions shared across the appsvc crates

mod config_types;
mod platform;
mod reporting;

pub use config_types::*;
pub use platform::*;
pub use reporting::*;
