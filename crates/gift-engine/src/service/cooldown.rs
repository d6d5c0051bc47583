//! 冷却期判断
//!
//! 同一访客（ip 或会话令牌任一相同）两次领取之间至少间隔 [`COOLDOWN_WINDOW`]。
//! 查询结果仅供调用方展示倒计时，领取时会在事务内重新判断。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use gift_shared::observability::metrics;

use crate::clock::Clock;
use crate::error::Result;
use crate::models::Identity;
use crate::repository::ClaimLedger;
use crate::store::{KvRead, SharedStore};

/// 冷却窗口：6 小时，编译期固定
pub const COOLDOWN_WINDOW: Duration = Duration::from_secs(6 * 60 * 60);

/// 冷却检查结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownStatus {
    pub allowed: bool,
    /// 剩余等待时间，允许领取时为 0
    pub remaining: Duration,
}

impl CooldownStatus {
    pub fn ready() -> Self {
        Self {
            allowed: true,
            remaining: Duration::ZERO,
        }
    }

    pub fn waiting(remaining: Duration) -> Self {
        Self {
            allowed: false,
            remaining,
        }
    }

    /// 剩余毫秒数，超出 u64 时取上限
    pub fn remaining_ms(&self) -> u64 {
        u64::try_from(self.remaining.as_millis()).unwrap_or(u64::MAX)
    }
}

/// 冷却守卫
#[derive(Debug, Clone)]
pub struct CooldownGuard {
    store: SharedStore,
    clock: Arc<dyn Clock>,
}

impl CooldownGuard {
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 查询身份当前是否可以领取
    #[instrument(skip(self), fields(identity = %identity.key()))]
    pub fn check(&self, identity: &Identity) -> Result<CooldownStatus> {
        let status = self.check_at(&self.store.read(), identity, self.clock.now())?;
        metrics::record_cooldown_check(status.allowed);
        Ok(status)
    }

    /// 在给定视图与时间点上判断
    ///
    /// 领取记录时间晚于 `now`（时钟回拨）时按刚领取处理。
    pub fn check_at<R: KvRead>(
        &self,
        reader: &R,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<CooldownStatus> {
        let Some(last) = ClaimLedger::latest_in(reader, identity)? else {
            return Ok(CooldownStatus::ready());
        };

        let elapsed = (now - last.timestamp).to_std().unwrap_or(Duration::ZERO);
        if elapsed >= COOLDOWN_WINDOW {
            return Ok(CooldownStatus::ready());
        }

        let remaining = COOLDOWN_WINDOW - elapsed;
        debug!(
            claim_id = %last.id,
            remaining_secs = remaining.as_secs(),
            "Identity in cooldown"
        );
        Ok(CooldownStatus::waiting(remaining))
    }
}
