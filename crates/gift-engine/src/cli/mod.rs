//! CLI 模块
//!
//! 命令行前端，覆盖引擎的全部边界操作：
//!
//! - `init` - 初始化存储（可选写入示例券）
//! - `list` / `add` / `edit` / `toggle` - 优惠券管理
//! - `check` / `next` / `claim` - 冷却查询、轮转发放、领取
//! - `stats` / `history` - 管理端统计与领取历史
//! - `session` / `admin-login` - 会话令牌与管理员校验
//!
//! # 使用示例
//!
//! ```bash
//! gift-engine init --with-samples
//! gift-engine next --ip 203.0.113.7
//! gift-engine claim --ip 203.0.113.7 <coupon-id>
//! gift-engine --data-dir /var/lib/gift check --ip 203.0.113.7 --session session_abc
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands, IdentityArgs};
pub use runner::CommandRunner;
