//! 仓储层
//!
//! 封装优惠券集合与领取记录的读写。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据读写与实体级约束，不包含冷却、轮转等业务流程
//! - `*_in_tx` 函数在调用方的事务内执行，事务边界由服务层决定
//! - 读取函数对 [`ReadView`](crate::store::ReadView) 与事务通用

mod claim_ledger;
mod coupon_registry;

pub use claim_ledger::{ClaimLedger, ClaimedSets};
pub use coupon_registry::CouponRegistry;
