//! 领券引擎错误类型
//!
//! 定义引擎的业务错误和系统错误

use std::time::Duration;

use thiserror::Error;

/// 错误分类
///
/// 调用方据此决定展示方式：校验类提示修正输入，冷却类提示等待，系统类提示重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Cooldown,
    Auth,
    System,
}

/// 领券引擎错误类型
#[derive(Debug, Error)]
pub enum GiftError {
    // === 输入错误 ===
    #[error("参数校验失败: {0}")]
    Validation(String),

    // === 优惠券相关错误 ===
    #[error("优惠券不存在: {0}")]
    CouponNotFound(String),

    #[error("优惠券已被领取: {0}")]
    CouponAlreadyUsed(String),

    #[error("优惠券未启用: {0}")]
    CouponInactive(String),

    // === 领取限制 ===
    #[error("冷却期内无法领取，剩余 {}s", .remaining.as_secs())]
    CooldownActive { remaining: Duration },

    // === 管理端 ===
    #[error("用户名或密码错误")]
    InvalidCredentials,

    // === 系统错误 ===
    #[error("存储错误: {0}")]
    Storage(String),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 领券引擎 Result 类型别名
pub type Result<T> = std::result::Result<T, GiftError>;

impl From<validator::ValidationErrors> for GiftError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl GiftError {
    /// 归入的错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::CouponNotFound(_) => ErrorKind::NotFound,
            Self::CouponAlreadyUsed(_) | Self::CouponInactive(_) => ErrorKind::Conflict,
            Self::CooldownActive { .. } => ErrorKind::Cooldown,
            Self::InvalidCredentials => ErrorKind::Auth,
            Self::Storage(_) | Self::Serialization(_) | Self::Io(_) | Self::Internal(_) => {
                ErrorKind::System
            }
        }
    }

    /// 检查是否为可重试的错误
    ///
    /// 冷却错误会随时间自行解除，但何时重试由调用方决定，这里只标记存储类故障。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_))
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        self.kind() != ErrorKind::System
    }

    /// 冷却剩余时间（仅冷却错误有值）
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        match self {
            Self::CooldownActive { remaining } => Some(*remaining),
            _ => None,
        }
    }

    /// 获取错误码（用于命令行输出）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::CouponNotFound(_) => "COUPON_NOT_FOUND",
            Self::CouponAlreadyUsed(_) => "COUPON_ALREADY_USED",
            Self::CouponInactive(_) => "COUPON_INACTIVE",
            Self::CooldownActive { .. } => "COOLDOWN_ACTIVE",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
