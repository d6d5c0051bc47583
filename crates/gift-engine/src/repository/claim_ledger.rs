//! 领取账本
//!
//! 只追加的领取记录，是冷却判断与按身份去重的唯一依据。
//! 追加时同步维护「精确身份键 -> 已领取券 ID」映射。

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::clock::Clock;
use crate::error::Result;
use crate::models::{Claim, Identity};
use crate::store::{KvRead, SharedStore, Transaction, keys};

/// 精确身份键 -> 已领取的券 ID（按领取顺序）
pub type ClaimedSets = BTreeMap<String, Vec<String>>;

/// 领取账本
#[derive(Debug, Clone)]
pub struct ClaimLedger {
    store: SharedStore,
    clock: Arc<dyn Clock>,
}

impl ClaimLedger {
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 全部领取记录（插入顺序）
    pub fn all(&self) -> Result<Vec<Claim>> {
        Self::load(&self.store.read())
    }

    /// 追加一条领取记录（独立事务）
    ///
    /// 不会标记优惠券为已使用，领取流程应通过 `AllocationService::claim`。
    #[instrument(skip(self))]
    pub fn append(&self, identity: &Identity, coupon_id: &str) -> Result<Claim> {
        let mut tx = self.store.begin();
        let claim = Self::append_in_tx(&mut tx, identity, coupon_id, self.clock.now())?;
        tx.commit()?;
        Ok(claim)
    }

    /// 与给定身份等价（ip 或令牌相同）的最近一条领取记录
    pub fn latest_for(&self, identity: &Identity) -> Result<Option<Claim>> {
        Self::latest_in(&self.store.read(), identity)
    }

    /// 该精确身份已领取过的券 ID
    pub fn claimed_by(&self, identity: &Identity) -> Result<Vec<String>> {
        Self::claimed_by_in(&self.store.read(), identity)
    }

    // ==================== 事务内操作 ====================

    pub fn load<R: KvRead>(reader: &R) -> Result<Vec<Claim>> {
        Ok(reader.get_json(keys::CLAIMS)?.unwrap_or_default())
    }

    pub fn load_claimed_sets<R: KvRead>(reader: &R) -> Result<ClaimedSets> {
        Ok(reader.get_json(keys::CLAIMED_SETS)?.unwrap_or_default())
    }

    /// 按时间倒序取最近一条；时间相同时后插入的优先
    pub fn latest_in<R: KvRead>(reader: &R, identity: &Identity) -> Result<Option<Claim>> {
        let claims = Self::load(reader)?;
        let mut latest: Option<Claim> = None;

        for claim in claims {
            if !claim.identity.is_equivalent(identity) {
                continue;
            }
            let newer = latest
                .as_ref()
                .is_none_or(|current| claim.timestamp >= current.timestamp);
            if newer {
                latest = Some(claim);
            }
        }

        Ok(latest)
    }

    pub fn claimed_by_in<R: KvRead>(reader: &R, identity: &Identity) -> Result<Vec<String>> {
        let mut sets = Self::load_claimed_sets(reader)?;
        Ok(sets.remove(&identity.key()).unwrap_or_default())
    }

    /// 在事务内追加领取记录并更新该精确身份的已领取集合
    pub fn append_in_tx(
        tx: &mut Transaction<'_>,
        identity: &Identity,
        coupon_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Claim> {
        let claim = Claim::new(identity.clone(), coupon_id, now);

        let mut claims = Self::load(tx)?;
        claims.push(claim.clone());
        tx.put_json(keys::CLAIMS, &claims)?;

        let mut sets = Self::load_claimed_sets(tx)?;
        let claimed = sets.entry(identity.key()).or_default();
        if !claimed.iter().any(|id| id == coupon_id) {
            claimed.push(coupon_id.to_string());
        }
        tx.put_json(keys::CLAIMED_SETS, &sets)?;

        debug!(claim_id = %claim.id, coupon_id = %coupon_id, "Claim appended");
        Ok(claim)
    }
}
