//! 优惠券实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::claim::Claim;
use crate::error::{GiftError, Result};

/// 优惠券
///
/// `is_used` 只会从 false 变为 true 一次，此时 `used_at` 与 `used_by` 同时写入且之后不再变化。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: String,
    /// 券码
    pub code: String,
    pub description: String,
    /// 管理端控制的启用状态
    pub is_active: bool,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
    /// 消耗这张券的领取记录 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_by: Option<String>,
}

impl Coupon {
    /// 创建一张启用且未使用的券
    pub fn new(code: impl Into<String>, description: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            code: code.into(),
            description: description.into(),
            is_active: true,
            is_used: false,
            created_at: now,
            used_at: None,
            used_by: None,
        }
    }

    /// 是否可发放（启用且未使用）
    pub fn is_available(&self) -> bool {
        self.is_active && !self.is_used
    }

    /// 使用状态与 used_at / used_by 是否一致
    pub fn is_consistent(&self) -> bool {
        self.is_used == self.used_at.is_some() && self.is_used == self.used_by.is_some()
    }

    /// 标记为已使用
    pub fn mark_used(&mut self, claim: &Claim) -> Result<()> {
        if self.is_used {
            return Err(GiftError::CouponAlreadyUsed(self.id.clone()));
        }

        self.is_used = true;
        self.used_at = Some(claim.timestamp);
        self.used_by = Some(claim.id.clone());
        Ok(())
    }
}

/// 新建优惠券的输入
///
/// 券码与描述会先去掉首尾空白再校验。
#[derive(Debug, Clone, Validate)]
pub struct NewCoupon {
    #[validate(length(min = 1, message = "券码不能为空"))]
    pub code: String,
    #[validate(length(min = 1, message = "描述不能为空"))]
    pub description: String,
}

impl NewCoupon {
    pub fn new(code: &str, description: &str) -> Self {
        Self {
            code: code.trim().to_string(),
            description: description.trim().to_string(),
        }
    }

    /// 校验后返回自身
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }
}
