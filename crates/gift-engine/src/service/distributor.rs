//! 优惠券轮转发放
//!
//! 按创建顺序在可发放的券中轮转，为每个身份挑出下一张要展示的券。
//! 发放只推进游标，不消耗优惠券；消耗由领取流程在事务内重新校验后完成。
//!
//! ## 选券步骤
//!
//! 1. 可发放集合 AC：启用且未使用的券（创建顺序）
//! 2. AC 为空时返回 `None`，游标不变
//! 3. 排除该精确身份已领取过的券，得到 AVAILABLE
//! 4. 候选列表 L = AVAILABLE 非空时取 AVAILABLE，否则回退到 AC
//! 5. 按 [`RotationPolicy`] 推进游标并在同一事务内持久化

use tracing::{debug, instrument};

use gift_shared::config::RotationPolicy;
use gift_shared::observability::metrics;

use crate::error::Result;
use crate::models::{Coupon, Identity};
use crate::repository::{ClaimLedger, CouponRegistry};
use crate::store::{KvRead, SharedStore, Transaction, keys};

/// 未发放过任何券时的游标值
pub const INITIAL_CURSOR: i64 = -1;

/// 轮转发放器
#[derive(Debug, Clone)]
pub struct Distributor {
    store: SharedStore,
    policy: RotationPolicy,
}

impl Distributor {
    pub fn new(store: SharedStore, policy: RotationPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    /// 当前持久化的游标
    pub fn cursor(&self) -> Result<i64> {
        Self::load_cursor(&self.store.read())
    }

    /// 为身份挑选下一张券
    ///
    /// 游标的读取、推进与持久化在同一事务内完成，并发调用不会得到相同的推进结果。
    #[instrument(skip(self), fields(identity = %identity.key()))]
    pub fn next(&self, identity: &Identity) -> Result<Option<Coupon>> {
        let mut tx = self.store.begin();
        let offered = self.next_in_tx(&mut tx, identity)?;
        tx.commit()?;

        metrics::record_offer(offered.is_some());
        Ok(offered)
    }

    /// 在事务内选券并暂存新游标
    pub fn next_in_tx(
        &self,
        tx: &mut Transaction<'_>,
        identity: &Identity,
    ) -> Result<Option<Coupon>> {
        // 保留券在整个券池中的位置，PoolPosition 策略按位置推进
        let available: Vec<(usize, Coupon)> = CouponRegistry::load(tx)?
            .into_iter()
            .enumerate()
            .filter(|(_, c)| c.is_available())
            .collect();

        if available.is_empty() {
            debug!("No coupon available");
            return Ok(None);
        }

        let excluded = ClaimLedger::claimed_by_in(tx, identity)?;
        let novel: Vec<&(usize, Coupon)> = available
            .iter()
            .filter(|(_, c)| !excluded.contains(&c.id))
            .collect();
        let candidates: Vec<&(usize, Coupon)> = if novel.is_empty() {
            available.iter().collect()
        } else {
            novel
        };

        let cursor = Self::load_cursor(tx)?;
        let (next_cursor, chosen) = match self.policy {
            RotationPolicy::SharedCursor => {
                let index = (cursor + 1).rem_euclid(candidates.len() as i64);
                (index, candidates[index as usize])
            }
            RotationPolicy::PoolPosition => {
                let chosen = candidates
                    .iter()
                    .find(|(position, _)| *position as i64 > cursor)
                    .unwrap_or(&candidates[0]);
                (chosen.0 as i64, *chosen)
            }
        };

        tx.put_json(keys::ROTATION_CURSOR, &next_cursor)?;
        debug!(
            cursor = next_cursor,
            candidates = candidates.len(),
            excluded = excluded.len(),
            coupon_id = %chosen.1.id,
            "Coupon offered"
        );
        Ok(Some(chosen.1.clone()))
    }

    pub fn load_cursor<R: KvRead>(reader: &R) -> Result<i64> {
        Ok(reader
            .get_json(keys::ROTATION_CURSOR)?
            .unwrap_or(INITIAL_CURSOR))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::clock::SystemClock;
    use crate::models::Claim;

    struct Fixture {
        registry: CouponRegistry,
        ledger: ClaimLedger,
        distributor: Distributor,
    }

    fn fixture(policy: RotationPolicy, codes: &[&str]) -> (Fixture, Vec<Coupon>) {
        let store = SharedStore::memory();
        let clock = Arc::new(SystemClock);
        let fixture = Fixture {
            registry: CouponRegistry::new(store.clone(), clock.clone()),
            ledger: ClaimLedger::new(store.clone(), clock),
            distributor: Distributor::new(store, policy),
        };
        let coupons = codes
            .iter()
            .map(|code| fixture.registry.add(code, "desc").unwrap())
            .collect();
        (fixture, coupons)
    }

    fn consume(fixture: &Fixture, identity: &Identity, coupon: &Coupon) {
        let claim = fixture.ledger.append(identity, &coupon.id).unwrap();
        fixture.registry.mark_used(&coupon.id, &claim).unwrap();
    }

    #[test]
    fn test_empty_pool_returns_none_and_keeps_cursor() {
        let (f, _) = fixture(RotationPolicy::SharedCursor, &[]);
        assert!(f.distributor.next(&Identity::new("1.1.1.1", "s")).unwrap().is_none());
        assert_eq!(f.distributor.cursor().unwrap(), INITIAL_CURSOR);
    }

    #[test]
    fn test_cycles_in_creation_order() {
        for policy in [RotationPolicy::SharedCursor, RotationPolicy::PoolPosition] {
            let (f, coupons) = fixture(policy, &["A", "B", "C"]);

            let offered: Vec<String> = (0..7)
                .map(|i| {
                    let identity = Identity::new(format!("10.0.0.{i}"), format!("s{i}"));
                    f.distributor.next(&identity).unwrap().unwrap().id
                })
                .collect();

            let expected: Vec<String> = (0..7).map(|i| coupons[i % 3].id.clone()).collect();
            assert_eq!(offered, expected, "policy {:?}", policy);
            assert_eq!(f.distributor.cursor().unwrap(), 0);
        }
    }

    #[test]
    fn test_inactive_and_used_are_skipped() {
        let (f, coupons) = fixture(RotationPolicy::SharedCursor, &["A", "B", "C"]);
        f.registry.toggle_active(&coupons[0].id).unwrap();
        consume(&f, &Identity::new("9.9.9.9", "x"), &coupons[1]);

        for _ in 0..3 {
            let offered = f.distributor.next(&Identity::new("1.1.1.1", "s")).unwrap();
            assert_eq!(offered.unwrap().id, coupons[2].id);
        }
    }

    #[test]
    fn test_excludes_coupons_claimed_by_exact_identity() {
        let (f, coupons) = fixture(RotationPolicy::SharedCursor, &["A", "B", "C"]);
        let identity = Identity::new("1.1.1.1", "s");

        // 模拟该身份曾领取过 B，但 B 仍可发放
        let mut tx = f.distributor.store.begin();
        ClaimLedger::append_in_tx(&mut tx, &identity, &coupons[1].id, Utc::now()).unwrap();
        tx.commit().unwrap();

        // 候选列表为 [A, C]
        let first = f.distributor.next(&identity).unwrap().unwrap();
        let second = f.distributor.next(&identity).unwrap().unwrap();
        assert_eq!(first.id, coupons[0].id);
        assert_eq!(second.id, coupons[2].id);

        // 其他身份不受影响，共享游标继续推进：(1 + 1) mod 3 = 2
        let other = f.distributor.next(&Identity::new("2.2.2.2", "t")).unwrap().unwrap();
        assert_eq!(other.id, coupons[2].id);
    }

    #[test]
    fn test_falls_back_to_claimed_when_nothing_novel() {
        let (f, coupons) = fixture(RotationPolicy::SharedCursor, &["A"]);
        let identity = Identity::new("1.1.1.1", "s");

        let mut tx = f.distributor.store.begin();
        ClaimLedger::append_in_tx(&mut tx, &identity, &coupons[0].id, Utc::now()).unwrap();
        tx.commit().unwrap();

        let offered = f.distributor.next(&identity).unwrap().unwrap();
        assert_eq!(offered.id, coupons[0].id);
    }

    #[test]
    fn test_shared_cursor_reused_across_list_sizes() {
        let (f, coupons) = fixture(RotationPolicy::SharedCursor, &["A", "B", "C"]);
        let first = Identity::new("1.1.1.1", "s1");

        assert_eq!(f.distributor.next(&first).unwrap().unwrap().id, coupons[0].id);
        consume(&f, &first, &coupons[0]);

        // 剩余 [B, C]，游标 (0 + 1) mod 2 = 1 落在 C 上，B 被跳过
        let second = Identity::new("2.2.2.2", "s2");
        assert_eq!(f.distributor.next(&second).unwrap().unwrap().id, coupons[2].id);
        assert_eq!(f.distributor.cursor().unwrap(), 1);

        // 游标回绕到 B
        assert_eq!(f.distributor.next(&first).unwrap().unwrap().id, coupons[1].id);
        assert_eq!(f.distributor.cursor().unwrap(), 0);
    }

    #[test]
    fn test_pool_position_keeps_creation_order_after_consumption() {
        let (f, coupons) = fixture(RotationPolicy::PoolPosition, &["A", "B", "C"]);
        let first = Identity::new("1.1.1.1", "s1");

        assert_eq!(f.distributor.next(&first).unwrap().unwrap().id, coupons[0].id);
        consume(&f, &first, &coupons[0]);

        let second = Identity::new("2.2.2.2", "s2");
        assert_eq!(f.distributor.next(&second).unwrap().unwrap().id, coupons[1].id);
        assert_eq!(f.distributor.cursor().unwrap(), 1);

        assert_eq!(f.distributor.next(&first).unwrap().unwrap().id, coupons[2].id);
        assert_eq!(f.distributor.cursor().unwrap(), 2);

        // 越过末尾后回到最前面的可发放券
        assert_eq!(f.distributor.next(&second).unwrap().unwrap().id, coupons[1].id);
    }

    #[test]
    fn test_stale_offer_after_claim_is_not_reoffered() {
        let (f, coupons) = fixture(RotationPolicy::PoolPosition, &["A", "B"]);
        let identity = Identity::new("1.1.1.1", "s1");
        let offered = f.distributor.next(&identity).unwrap().unwrap();
        assert_eq!(offered.id, coupons[0].id);

        let claim = Claim::new(identity.clone(), &offered.id, Utc::now());
        f.registry.mark_used(&offered.id, &claim).unwrap();

        for _ in 0..3 {
            let next = f.distributor.next(&identity).unwrap().unwrap();
            assert_eq!(next.id, coupons[1].id);
        }
    }
}
