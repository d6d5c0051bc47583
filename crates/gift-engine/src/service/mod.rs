//! 业务服务层
//!
//! - `cooldown`: 冷却期判断
//! - `distributor`: 轮转选出下一张可发放的券
//! - `allocation_service`: 领取的唯一写入口，原子地写领取记录并消耗优惠券
//! - `admin_gate`: 管理员凭证校验

mod admin_gate;
mod allocation_service;
mod cooldown;
mod distributor;

pub use admin_gate::AdminGate;
pub use allocation_service::AllocationService;
pub use cooldown::{COOLDOWN_WINDOW, CooldownGuard, CooldownStatus};
pub use distributor::{Distributor, INITIAL_CURSOR};
