//! 并发集成测试
//!
//! 多线程共享同一个引擎，验证领取与游标推进的串行化。

use std::collections::HashSet;
use std::thread;

use gift_engine::{EngineOptions, GiftEngine, GiftError, Identity};
use gift_shared::config::RotationPolicy;

#[test]
fn test_concurrent_claims_consume_coupon_once() {
    let engine = GiftEngine::in_memory(EngineOptions::default());
    engine.initialize().unwrap();
    let coupon = engine.add_coupon("ONLY1", "single coupon").unwrap();

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let engine = &engine;
                let coupon_id = coupon.id.clone();
                s.spawn(move || {
                    let identity = Identity::new(format!("10.1.0.{i}"), format!("session_{i}"));
                    engine.claim(&identity, &coupon_id)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, GiftError::CouponAlreadyUsed(_)))
    );

    assert_eq!(engine.ledger().all().unwrap().len(), 1);
    assert!(engine.list_coupons().unwrap()[0].is_used);
}

#[test]
fn test_concurrent_next_advances_cursor_once_per_call() {
    for rotation in [RotationPolicy::SharedCursor, RotationPolicy::PoolPosition] {
        let engine = GiftEngine::in_memory(EngineOptions::default().with_rotation(rotation));
        engine.initialize().unwrap();
        let pool_size = 12;
        for i in 0..pool_size {
            engine.add_coupon(&format!("CODE{i}"), "reward").unwrap();
        }

        let offered: Vec<String> = thread::scope(|s| {
            let handles: Vec<_> = (0..pool_size)
                .map(|i| {
                    let engine = &engine;
                    s.spawn(move || {
                        let identity =
                            Identity::new(format!("10.2.0.{i}"), format!("session_{i}"));
                        engine.next_coupon(&identity).unwrap().unwrap().id
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        // 每次调用推进到不同位置，一轮内不会重复
        let distinct: HashSet<&String> = offered.iter().collect();
        assert_eq!(distinct.len(), pool_size, "{rotation:?}");
        assert_eq!(
            engine.distributor().cursor().unwrap(),
            pool_size as i64 - 1
        );
    }
}

#[test]
fn test_concurrent_distinct_claims_all_succeed() {
    let engine = GiftEngine::in_memory(EngineOptions::default());
    engine.initialize().unwrap();
    let coupons: Vec<_> = (0..8)
        .map(|i| engine.add_coupon(&format!("CODE{i}"), "reward").unwrap())
        .collect();

    thread::scope(|s| {
        for (i, coupon) in coupons.iter().enumerate() {
            let engine = &engine;
            s.spawn(move || {
                let identity = Identity::new(format!("10.3.0.{i}"), format!("session_{i}"));
                engine.claim(&identity, &coupon.id).unwrap();
            });
        }
    });

    let stats = engine.stats().unwrap();
    assert_eq!(stats.claimed, 8);
    assert_eq!(stats.claim_rate, 100);
    assert_eq!(engine.claim_history().unwrap().len(), 8);
}
