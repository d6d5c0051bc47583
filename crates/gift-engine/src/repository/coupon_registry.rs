//! 优惠券仓储
//!
//! 持有优惠券集合及其生命周期状态：创建、管理端编辑、启停切换、一次性标记为已使用。
//! 集合按创建顺序保存，发放轮转依赖这一顺序。

use std::sync::Arc;

use tracing::{info, instrument};

use gift_shared::observability::metrics;

use crate::clock::Clock;
use crate::error::{GiftError, Result};
use crate::models::{Claim, Coupon, NewCoupon};
use crate::store::{KvRead, SharedStore, Transaction, keys};

/// 优惠券仓储
#[derive(Debug, Clone)]
pub struct CouponRegistry {
    store: SharedStore,
    clock: Arc<dyn Clock>,
}

impl CouponRegistry {
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 全部优惠券（创建顺序）
    pub fn list(&self) -> Result<Vec<Coupon>> {
        Self::load(&self.store.read())
    }

    pub fn get(&self, id: &str) -> Result<Option<Coupon>> {
        Self::find_in(&self.store.read(), id)
    }

    /// 新增优惠券
    ///
    /// 券码或描述为空时返回校验错误，集合保持不变。
    #[instrument(skip(self))]
    pub fn add(&self, code: &str, description: &str) -> Result<Coupon> {
        let input = NewCoupon::new(code, description).validated()?;

        let mut tx = self.store.begin();
        let coupon = Coupon::new(input.code, input.description, self.clock.now());
        let mut coupons = Self::load(&tx)?;
        coupons.push(coupon.clone());
        tx.put_json(keys::COUPONS, &coupons)?;
        tx.commit()?;

        metrics::record_admin_change("add");
        info!(coupon_id = %coupon.id, code = %coupon.code, "Coupon added");
        Ok(coupon)
    }

    /// 保存（新增或整体替换）优惠券
    #[instrument(skip(self, coupon), fields(coupon_id = %coupon.id))]
    pub fn save(&self, coupon: Coupon) -> Result<Coupon> {
        let mut tx = self.store.begin();
        let saved = Self::save_in_tx(&mut tx, coupon)?;
        tx.commit()?;

        metrics::record_admin_change("save");
        Ok(saved)
    }

    /// 管理端编辑券码与描述
    ///
    /// 已使用的券不可编辑。
    #[instrument(skip(self))]
    pub fn edit(&self, id: &str, code: &str, description: &str) -> Result<Coupon> {
        let mut tx = self.store.begin();
        let mut coupon =
            Self::find_in(&tx, id)?.ok_or_else(|| GiftError::CouponNotFound(id.to_string()))?;
        if coupon.is_used {
            return Err(GiftError::CouponAlreadyUsed(id.to_string()));
        }

        coupon.code = code.to_string();
        coupon.description = description.to_string();
        let saved = Self::save_in_tx(&mut tx, coupon)?;
        tx.commit()?;

        metrics::record_admin_change("edit");
        info!(coupon_id = %saved.id, code = %saved.code, "Coupon edited");
        Ok(saved)
    }

    /// 切换启用状态
    ///
    /// 已使用的券拒绝切换，保持原样。
    #[instrument(skip(self))]
    pub fn toggle_active(&self, id: &str) -> Result<Coupon> {
        let mut tx = self.store.begin();
        let mut coupons = Self::load(&tx)?;
        let coupon = coupons
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| GiftError::CouponNotFound(id.to_string()))?;

        if coupon.is_used {
            return Err(GiftError::CouponAlreadyUsed(id.to_string()));
        }

        coupon.is_active = !coupon.is_active;
        let updated = coupon.clone();
        tx.put_json(keys::COUPONS, &coupons)?;
        tx.commit()?;

        metrics::record_admin_change("toggle");
        info!(coupon_id = %updated.id, is_active = updated.is_active, "Coupon toggled");
        Ok(updated)
    }

    /// 标记为已使用（独立事务）
    ///
    /// 正常领取流程应通过 `AllocationService::claim`，它在同一事务内写入领取记录。
    #[instrument(skip(self, claim), fields(claim_id = %claim.id))]
    pub fn mark_used(&self, id: &str, claim: &Claim) -> Result<Coupon> {
        let mut tx = self.store.begin();
        let coupon = Self::mark_used_in_tx(&mut tx, id, claim)?;
        tx.commit()?;
        Ok(coupon)
    }

    // ==================== 事务内操作 ====================

    /// 读取全部优惠券，键不存在时视为空集合
    pub fn load<R: KvRead>(reader: &R) -> Result<Vec<Coupon>> {
        Ok(reader.get_json(keys::COUPONS)?.unwrap_or_default())
    }

    pub fn find_in<R: KvRead>(reader: &R, id: &str) -> Result<Option<Coupon>> {
        Ok(Self::load(reader)?.into_iter().find(|c| c.id == id))
    }

    /// 在事务内保存
    ///
    /// - 券码、描述去空白后不能为空
    /// - 使用状态只能由领取流程改变，保存不能翻转 `is_used`
    /// - 已使用的券不可修改
    pub fn save_in_tx(tx: &mut Transaction<'_>, mut coupon: Coupon) -> Result<Coupon> {
        let input = NewCoupon::new(&coupon.code, &coupon.description).validated()?;
        coupon.code = input.code;
        coupon.description = input.description;

        if !coupon.is_consistent() {
            return Err(GiftError::Validation(format!(
                "使用状态与 usedAt/usedBy 不一致: coupon_id={}",
                coupon.id
            )));
        }

        let mut coupons = Self::load(tx)?;
        match coupons.iter_mut().find(|c| c.id == coupon.id) {
            Some(existing) => {
                if existing.is_used {
                    if *existing != coupon {
                        return Err(GiftError::CouponAlreadyUsed(coupon.id));
                    }
                    return Ok(coupon);
                }
                if coupon.is_used {
                    return Err(GiftError::Validation(format!(
                        "使用状态只能通过领取变更: coupon_id={}",
                        coupon.id
                    )));
                }
                *existing = coupon.clone();
            }
            None => {
                if coupon.is_used {
                    return Err(GiftError::Validation(format!(
                        "不能保存已使用的新券: coupon_id={}",
                        coupon.id
                    )));
                }
                coupons.push(coupon.clone());
            }
        }

        tx.put_json(keys::COUPONS, &coupons)?;
        Ok(coupon)
    }

    /// 在事务内标记为已使用
    pub fn mark_used_in_tx(tx: &mut Transaction<'_>, id: &str, claim: &Claim) -> Result<Coupon> {
        let mut coupons = Self::load(tx)?;
        let coupon = coupons
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| GiftError::CouponNotFound(id.to_string()))?;

        coupon.mark_used(claim)?;
        let updated = coupon.clone();
        tx.put_json(keys::COUPONS, &coupons)?;
        Ok(updated)
    }
}
