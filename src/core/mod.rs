pub mod catalog;
pub mod environment;
pub mod harness;
pub mod install;
pub mod readiness;
pub mod recorder;
pub mod setup;

pub use crate::domain::model::{CatalogItem, InstallOutcome, PollOutcome, RunReport, Stage};
pub use crate::domain::ports::{ServiceController, StatusSource};
pub use crate::utils::error::Result;
