//! CLI 命令定义
//!
//! 使用 clap derive 宏定义命令行接口结构。

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// 优惠券发放引擎命令行工具
///
/// 所有命令输出 JSON；失败时输出错误码并以非零状态退出。
#[derive(Parser, Debug)]
#[command(name = "gift-engine")]
#[command(version, about = "单次使用优惠券发放引擎")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)，覆盖配置文件
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// 数据目录，覆盖配置文件
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// 命令结束后把指标快照输出到 stderr
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// 访客身份参数
#[derive(Args, Debug, Clone)]
pub struct IdentityArgs {
    /// 访客网络地址
    #[arg(long)]
    pub ip: String,

    /// 会话令牌，缺省使用本机保存的令牌
    #[arg(long)]
    pub session: Option<String>,
}

/// 子命令枚举
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 初始化存储，只写入缺失的键
    Init {
        /// 优惠券集合为空时写入示例券
        #[arg(long)]
        with_samples: bool,
    },

    /// 列出全部优惠券（创建顺序）
    List,

    /// 新增优惠券
    Add {
        /// 券码
        #[arg(short, long)]
        code: String,

        /// 描述
        #[arg(short, long)]
        description: String,
    },

    /// 编辑未使用的优惠券
    Edit {
        /// 优惠券 ID
        id: String,

        #[arg(short, long)]
        code: String,

        #[arg(short, long)]
        description: String,
    },

    /// 切换启用状态
    Toggle {
        /// 优惠券 ID
        id: String,
    },

    /// 查询冷却状态
    Check {
        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// 为访客挑选下一张券
    Next {
        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// 领取优惠券
    Claim {
        #[command(flatten)]
        identity: IdentityArgs,

        /// 优惠券 ID
        coupon_id: String,
    },

    /// 管理端统计
    Stats,

    /// 领取历史（最新在前，脱敏）
    History,

    /// 本机会话令牌
    Session,

    /// 校验管理员凭证
    AdminLogin {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },
}

// ============================================================================
// 单元测试
// ============================================================================
