pub mod toml_config;

pub use toml_config::HarnessConfig;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "registry-harness")]
#[command(about = "Brings up the registry stack and checks that every package installs")]
pub struct CliConfig {
    /// Path to TOML configuration file; built-in defaults are used when omitted
    #[arg(short, long)]
    pub config: Option<String>,

    /// Write the JSON run report to this file
    #[arg(long)]
    pub report: Option<String>,

    /// Override readiness.max_attempts
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Override install.concurrency
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Skip pulling images before starting the services
    #[arg(long)]
    pub no_pull: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入配置檔並套用命令列覆蓋設定
    pub fn load_harness_config(&self) -> Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_file(path)?,
            None => HarnessConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut HarnessConfig) {
        if let Some(max_attempts) = self.max_attempts {
            config.readiness.max_attempts = max_attempts;
        }
        if let Some(concurrency) = self.concurrency {
            config.install.concurrency = concurrency;
        }
        if self.no_pull {
            config.environment.pull = false;
        }
    }
}
