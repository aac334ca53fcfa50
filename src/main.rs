use clap::Parser;
use registry_harness::utils::{logger, validation::Validate};
use registry_harness::{CliConfig, ComposeController, Harness, RunReport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting registry-harness");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let config = match cli
        .load_harness_config()
        .and_then(|config| config.validate().map(|_| config))
    {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(2);
        }
    };

    let controller = ComposeController::new(&config.environment.command)?;
    let harness = Harness::new(&config, controller)?;

    let report = harness.run().await;
    print_summary(&report);

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)?;
        tracing::info!("📁 Report saved to: {}", path);
    }

    if !report.passed() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    if let Some(readiness) = report.readiness {
        let state = if readiness.is_ready() {
            "ready"
        } else {
            "not ready"
        };
        println!(
            "Readiness: {} after {} attempts",
            state,
            readiness.attempts()
        );
    }

    for outcome in &report.outcomes {
        let mark = if outcome.passed() { "✅" } else { "❌" };
        println!("{} {}", mark, outcome.key);
    }

    for failure in &report.failures {
        eprintln!("❌ {}", failure);
    }

    if report.passed() {
        println!(
            "✅ PASS: {} packages verified",
            report.verified_count()
        );
    } else {
        println!(
            "❌ FAIL: {} failures, {} of {} packages verified",
            report.failures.len(),
            report.verified_count(),
            report.outcomes.len()
        );
    }
}
