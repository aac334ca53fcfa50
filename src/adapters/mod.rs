// Adapters layer: concrete implementations for external systems (compose CLI, HTTP API).

pub mod compose;
pub mod http;

pub use compose::ComposeController;
pub use http::{ApiClient, ApiResponse};
