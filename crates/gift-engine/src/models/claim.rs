//! 领取记录与访客身份

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 访客身份
///
/// 由网络地址与客户端会话令牌组成的弱指纹，可被伪造。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub ip: String,
    pub session_token: String,
}

impl Identity {
    pub fn new(ip: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            session_token: session_token.into(),
        }
    }

    /// 精确身份键（ip 与令牌都参与）
    ///
    /// ip 带长度前缀，两段中出现分隔符也不会与其他身份的键相同。
    pub fn key(&self) -> String {
        format!("{}:{}|{}", self.ip.len(), self.ip, self.session_token)
    }

    /// 冷却意义上的等价：ip 相同或令牌相同即视为同一访客
    ///
    /// 共享出口地址的访客会互相占用冷却期。
    pub fn is_equivalent(&self, other: &Identity) -> bool {
        self.ip == other.ip || self.session_token == other.session_token
    }

    /// 脱敏 IP：保留前两段，如 `192.168.***.***`
    pub fn masked_ip(&self) -> String {
        let parts: Vec<&str> = self.ip.split('.').collect();
        if parts.len() >= 2 {
            format!("{}.{}.***.***", parts[0], parts[1])
        } else {
            "***".to_string()
        }
    }

    /// 脱敏会话令牌：超过 8 个字符时只保留前 8 个
    pub fn masked_session(&self) -> String {
        if self.session_token.chars().count() <= 8 {
            return self.session_token.clone();
        }
        let prefix: String = self.session_token.chars().take(8).collect();
        format!("{}...", prefix)
    }
}

/// 领取记录
///
/// 只追加，写入后不修改、不删除。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: String,
    #[serde(flatten)]
    pub identity: Identity,
    pub coupon_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Claim {
    pub fn new(identity: Identity, coupon_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            identity,
            coupon_id: coupon_id.into(),
            timestamp,
        }
    }
}
