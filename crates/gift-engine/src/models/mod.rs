//! 领域模型定义
//!
//! 存储中的所有值均以 camelCase JSON 编码。

mod admin;
mod claim;
mod coupon;
mod stats;

pub use admin::AdminProfile;
pub use claim::{Claim, Identity};
pub use coupon::{Coupon, NewCoupon};
pub use stats::{ClaimHistoryEntry, DashboardStats};
