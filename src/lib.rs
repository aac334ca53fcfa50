pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{ApiClient, ComposeController};
pub use config::HarnessConfig;
pub use crate::core::harness::Harness;
pub use domain::model::RunReport;
pub use utils::error::{HarnessError, Result};
