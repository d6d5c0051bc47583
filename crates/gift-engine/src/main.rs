//! Gift Engine CLI
//!
//! 加载配置、初始化日志与指标，执行单个子命令并以 JSON 输出结果。

use std::process::ExitCode;

use clap::Parser;
use serde_json::json;
use tracing::error;

use gift_engine::GiftEngine;
use gift_engine::cli::{Cli, CommandRunner};
use gift_shared::config::AppConfig;
use gift_shared::observability;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AppConfig::load("gift-engine")?;
    // 命令行参数优先于配置文件与 GIFT_ 环境变量
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    if let Some(dir) = cli.data_dir {
        config.store.data_dir = dir;
    }

    let guard = observability::init(&config.service_name, &config.observability, cli.metrics)?;

    let runner = CommandRunner::new(GiftEngine::from_config(&config)?);
    let code = match runner.execute(cli.command) {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error_code = e.error_code(), error = %e, "Command failed");
            let mut body = json!({ "error": e.error_code(), "message": e.to_string() });
            if let Some(remaining) = e.cooldown_remaining() {
                let remaining_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
                body["remainingMs"] = json!(remaining_ms);
            }
            println!("{}", serde_json::to_string_pretty(&body)?);
            ExitCode::FAILURE
        }
    };

    if let Some(snapshot) = guard.render_metrics() {
        eprintln!("{snapshot}");
    }

    Ok(code)
}
