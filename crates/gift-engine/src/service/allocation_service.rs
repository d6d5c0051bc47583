//! 领取服务
//!
//! 领取是消耗优惠券的唯一入口。冷却复查、券状态校验、写领取记录、标记已使用
//! 都在同一个事务内完成，任何一步失败都不会留下部分写入。

use std::sync::Arc;

use tracing::{info, instrument, warn};

use gift_shared::observability::metrics;

use super::CooldownGuard;
use crate::clock::Clock;
use crate::error::{GiftError, Result};
use crate::models::{Claim, Identity};
use crate::repository::{ClaimLedger, CouponRegistry};
use crate::store::SharedStore;

/// 领取服务
#[derive(Debug, Clone)]
pub struct AllocationService {
    store: SharedStore,
    clock: Arc<dyn Clock>,
    cooldown: CooldownGuard,
}

impl AllocationService {
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>) -> Self {
        let cooldown = CooldownGuard::new(store.clone(), clock.clone());
        Self {
            store,
            clock,
            cooldown,
        }
    }

    /// 领取优惠券
    ///
    /// # 错误
    ///
    /// - `CooldownActive`: 等价身份仍在冷却期内
    /// - `CouponNotFound`: 券不存在
    /// - `CouponAlreadyUsed` / `CouponInactive`: 券已被消耗或已停用
    #[instrument(skip(self), fields(identity = %identity.key()))]
    pub fn claim(&self, identity: &Identity, coupon_id: &str) -> Result<Claim> {
        let mut tx = self.store.begin();
        let now = self.clock.now();

        let status = self.cooldown.check_at(&tx, identity, now)?;
        if !status.allowed {
            metrics::record_claim_rejection("cooldown");
            warn!(
                remaining_secs = status.remaining.as_secs(),
                "Claim rejected: cooldown active"
            );
            return Err(GiftError::CooldownActive {
                remaining: status.remaining,
            });
        }

        let Some(coupon) = CouponRegistry::find_in(&tx, coupon_id)? else {
            metrics::record_claim_rejection("not_found");
            return Err(GiftError::CouponNotFound(coupon_id.to_string()));
        };
        if coupon.is_used {
            metrics::record_claim_rejection("already_used");
            warn!(coupon_id = %coupon_id, "Claim rejected: coupon already used");
            return Err(GiftError::CouponAlreadyUsed(coupon_id.to_string()));
        }
        if !coupon.is_active {
            metrics::record_claim_rejection("inactive");
            return Err(GiftError::CouponInactive(coupon_id.to_string()));
        }

        let claim = ClaimLedger::append_in_tx(&mut tx, identity, coupon_id, now)?;
        CouponRegistry::mark_used_in_tx(&mut tx, coupon_id, &claim)?;
        tx.commit()?;

        metrics::record_claim();
        info!(
            claim_id = %claim.id,
            coupon_id = %coupon_id,
            code = %coupon.code,
            "Coupon claimed"
        );
        Ok(claim)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration as ChronoDuration;
    use mockall::Sequence;

    use super::*;
    use crate::clock::ManualClock;
    use crate::service::COOLDOWN_WINDOW;
    use crate::store::{KvStore, MemoryStore, MockKvStore, keys};

    struct Fixture {
        registry: CouponRegistry,
        ledger: ClaimLedger,
        service: AllocationService,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store = SharedStore::memory();
        let clock = Arc::new(ManualClock::default());
        Fixture {
            registry: CouponRegistry::new(store.clone(), clock.clone()),
            ledger: ClaimLedger::new(store.clone(), clock.clone()),
            service: AllocationService::new(store, clock.clone()),
            clock,
        }
    }

    #[test]
    fn test_claim_marks_coupon_used() {
        let f = fixture();
        let coupon = f.registry.add("FREE10", "10% off").unwrap();
        let identity = Identity::new("10.0.0.1", "s1");

        let claim = f.service.claim(&identity, &coupon.id).unwrap();

        let stored = f.registry.get(&coupon.id).unwrap().unwrap();
        assert!(stored.is_used);
        assert_eq!(stored.used_by.as_deref(), Some(claim.id.as_str()));
        assert_eq!(stored.used_at, Some(claim.timestamp));
        assert_eq!(f.ledger.all().unwrap(), vec![claim]);
        assert_eq!(
            f.ledger.claimed_by(&identity).unwrap(),
            vec![coupon.id.clone()]
        );
    }

    #[test]
    fn test_claim_rejects_during_cooldown() {
        let f = fixture();
        let a = f.registry.add("A", "a").unwrap();
        let b = f.registry.add("B", "b").unwrap();
        let identity = Identity::new("10.0.0.1", "s1");

        f.service.claim(&identity, &a.id).unwrap();
        f.clock.advance(ChronoDuration::hours(1));

        // 同 ip 换令牌也属于同一冷却等价类
        let err = f
            .service
            .claim(&Identity::new("10.0.0.1", "s2"), &b.id)
            .unwrap_err();
        assert_eq!(
            err.cooldown_remaining(),
            Some(COOLDOWN_WINDOW - std::time::Duration::from_secs(3600))
        );
        assert!(!f.registry.get(&b.id).unwrap().unwrap().is_used);
        assert_eq!(f.ledger.all().unwrap().len(), 1);

        f.clock.advance(ChronoDuration::hours(5));
        f.service.claim(&identity, &b.id).unwrap();
    }

    #[test]
    fn test_claim_lifecycle_conflicts() {
        let f = fixture();
        let used = f.registry.add("USED", "u").unwrap();
        let inactive = f.registry.add("OFF", "o").unwrap();
        f.registry.toggle_active(&inactive.id).unwrap();

        f.service
            .claim(&Identity::new("10.0.0.1", "s1"), &used.id)
            .unwrap();

        let other = Identity::new("10.0.0.2", "s2");
        assert!(matches!(
            f.service.claim(&other, &used.id).unwrap_err(),
            GiftError::CouponAlreadyUsed(_)
        ));
        assert!(matches!(
            f.service.claim(&other, &inactive.id).unwrap_err(),
            GiftError::CouponInactive(_)
        ));
        assert!(matches!(
            f.service.claim(&other, "missing").unwrap_err(),
            GiftError::CouponNotFound(_)
        ));
        assert_eq!(f.ledger.all().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_commit_leaves_no_partial_state() {
        // 先在内存后端中准备一张券
        let seed = MemoryStore::new();
        let seeded = SharedStore::new(Arc::new(seed.clone()));
        let clock = Arc::new(ManualClock::default());
        let coupon = CouponRegistry::new(seeded, clock.clone())
            .add("FREE10", "10% off")
            .unwrap();
        let coupons_json = seed.get(keys::COUPONS).unwrap();

        // claims 写入成功，coupons 写入失败，随后 claims 被恢复
        let mut mock = MockKvStore::new();
        let mut seq = Sequence::new();
        let coupons_for_get = coupons_json.clone();
        mock.expect_get().returning(move |key| match key {
            "coupons" => Ok(coupons_for_get.clone()),
            "claims" => Ok(Some(b"[]".to_vec())),
            _ => Ok(None),
        });
        mock.expect_set()
            .withf(|key, value| key == "claims" && value != b"[]")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        mock.expect_set()
            .withf(|key, _| key == "coupons")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(GiftError::Storage("disk full".to_string())));
        mock.expect_set()
            .withf(|key, value| key == "claims" && value == b"[]")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let service = AllocationService::new(SharedStore::new(Arc::new(mock)), clock);
        let err = service
            .claim(&Identity::new("10.0.0.1", "s1"), &coupon.id)
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
