//! 命令执行器
//!
//! 把子命令转化为引擎调用，结果统一转成 JSON 值交给入口输出。

use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use super::{Commands, IdentityArgs};
use crate::engine::GiftEngine;
use crate::error::Result;
use crate::format::format_time_left;
use crate::models::Identity;

/// 冷却查询输出
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CooldownView {
    allowed: bool,
    remaining_ms: u64,
    remaining: String,
}

/// 命令执行器
pub struct CommandRunner {
    engine: GiftEngine,
}

impl CommandRunner {
    pub fn new(engine: GiftEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &GiftEngine {
        &self.engine
    }

    /// 执行子命令
    pub fn execute(&self, command: Commands) -> Result<Value> {
        match command {
            Commands::Init { with_samples } => {
                let seeded = self.engine.initialize_with(with_samples)?;
                Ok(json!({ "seeded": seeded }))
            }
            Commands::List => to_value(self.engine.list_coupons()?),
            Commands::Add { code, description } => {
                to_value(self.engine.add_coupon(&code, &description)?)
            }
            Commands::Edit {
                id,
                code,
                description,
            } => to_value(self.engine.edit_coupon(&id, &code, &description)?),
            Commands::Toggle { id } => to_value(self.engine.toggle_active(&id)?),
            Commands::Check { identity } => self.run_check(&self.identity(identity)?),
            Commands::Next { identity } => {
                to_value(self.engine.next_coupon(&self.identity(identity)?)?)
            }
            Commands::Claim {
                identity,
                coupon_id,
            } => to_value(self.engine.claim(&self.identity(identity)?, &coupon_id)?),
            Commands::Stats => to_value(self.engine.stats()?),
            Commands::History => to_value(self.engine.claim_history()?),
            Commands::Session => Ok(json!({ "sessionToken": self.engine.session_token()? })),
            Commands::AdminLogin { username, password } => {
                self.engine.authenticate_admin(&username, &password)?;
                Ok(json!({ "authenticated": true, "username": username }))
            }
        }
    }

    fn run_check(&self, identity: &Identity) -> Result<Value> {
        let status = self.engine.check_cooldown(identity)?;
        info!(allowed = status.allowed, "Cooldown checked");

        to_value(CooldownView {
            allowed: status.allowed,
            remaining_ms: status.remaining_ms(),
            remaining: format_time_left(status.remaining),
        })
    }

    /// 未指定会话令牌时使用本机令牌
    fn identity(&self, args: IdentityArgs) -> Result<Identity> {
        let session = match args.session {
            Some(session) => session,
            None => self.engine.session_token()?,
        };
        Ok(Identity::new(args.ip, session))
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;
    use crate::engine::EngineOptions;

    fn runner() -> CommandRunner {
        CommandRunner::new(GiftEngine::in_memory(EngineOptions::default()))
    }

    fn run(runner: &CommandRunner, args: &[&str]) -> Result<Value> {
        let mut argv = vec!["gift-engine"];
        argv.extend_from_slice(args);
        runner.execute(Cli::parse_from(argv).command)
    }

    #[test]
    fn test_init_then_list_samples() {
        let runner = runner();
        let out = run(&runner, &["init", "--with-samples"]).unwrap();
        assert_eq!(out, json!({ "seeded": true }));

        let list = run(&runner, &["list"]).unwrap();
        let codes: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["FREE10", "WELCOME20", "SUMMER15"]);
    }

    #[test]
    fn test_next_claim_check_flow() {
        let runner = runner();
        run(&runner, &["init"]).unwrap();
        let added = run(&runner, &["add", "-c", "FREE10", "-d", "10% off"]).unwrap();
        let id = added["id"].as_str().unwrap().to_string();
        assert_eq!(added["isActive"], json!(true));

        let offered = run(&runner, &["next", "--ip", "10.0.0.1"]).unwrap();
        assert_eq!(offered["id"], json!(id));

        let claim = run(&runner, &["claim", "--ip", "10.0.0.1", id.as_str()]).unwrap();
        assert_eq!(claim["couponId"], json!(id));
        assert_eq!(claim["ip"], json!("10.0.0.1"));
        assert!(claim["sessionToken"].as_str().unwrap().starts_with("session_"));

        let check = run(&runner, &["check", "--ip", "10.0.0.1"]).unwrap();
        assert_eq!(check["allowed"], json!(false));
        let remaining = check["remaining"].as_str().unwrap();
        assert!(remaining == "6 hours and 0 minutes" || remaining == "5 hours and 59 minutes");

        // 券已消耗，没有可发放的券
        let next = run(&runner, &["next", "--ip", "10.0.0.2", "--session", "s2"]).unwrap();
        assert!(next.is_null());
    }

    #[test]
    fn test_errors_carry_codes() {
        let runner = runner();
        run(&runner, &["init"]).unwrap();

        let err = run(&runner, &["add", "-c", " ", "-d", "x"]).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let err = run(&runner, &["toggle", "missing"]).unwrap_err();
        assert_eq!(err.error_code(), "COUPON_NOT_FOUND");

        let err = run(&runner, &["admin-login", "-u", "admin", "-p", "nope"]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CREDENTIALS");

        let ok = run(&runner, &["admin-login", "-u", "admin", "-p", "admin123"]).unwrap();
        assert_eq!(ok["authenticated"], json!(true));
    }

    #[test]
    fn test_stats_output_is_camel_case() {
        let runner = runner();
        run(&runner, &["init", "--with-samples"]).unwrap();
        let stats = run(&runner, &["stats"]).unwrap();
        assert_eq!(stats["total"], json!(3));
        assert_eq!(stats["claimRate"], json!(0));
    }
}
