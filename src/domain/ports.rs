use crate::domain::model::{DownFlags, ServiceGroup, UpFlags};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Lifecycle operations of the external compose tool.
#[async_trait]
pub trait ServiceController: Send + Sync {
    async fn pull(&self, group: &ServiceGroup) -> Result<()>;
    async fn up(&self, group: &ServiceGroup, flags: &UpFlags) -> Result<()>;
    async fn down(&self, group: &ServiceGroup, flags: &DownFlags) -> Result<()>;
    async fn ps(&self, group: &ServiceGroup) -> Result<String>;
}

/// Anything that can describe the current state of the services as text.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn status(&self) -> Result<String>;
}
