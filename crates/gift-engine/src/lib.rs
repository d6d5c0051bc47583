//! Gift Engine
//!
//! 单次使用优惠券的发放引擎：按创建顺序轮转发放、按访客身份限制领取频率、
//! 保证每张券最多被领取一次。
//!
//! # 主要模块
//!
//! - `models`: 优惠券、领取记录、访客身份、管理端视图
//! - `store`: 键值存储接口与内存、文件两种实现，事务与回滚
//! - `repository`: 优惠券仓储与领取账本
//! - `service`: 冷却判断、轮转发放、领取、管理员校验
//! - `engine`: 组装以上组件的门面
//! - `cli`: 命令行前端
//!
//! # 使用示例
//!
//! ```rust
//! use gift_engine::{EngineOptions, GiftEngine, Identity};
//!
//! let engine = GiftEngine::in_memory(EngineOptions::default());
//! engine.initialize().unwrap();
//! let coupon = engine.add_coupon("FREE10", "10% off").unwrap();
//!
//! let visitor = Identity::new("203.0.113.7", "session_abc");
//! let offered = engine.next_coupon(&visitor).unwrap().unwrap();
//! assert_eq!(offered.id, coupon.id);
//!
//! engine.claim(&visitor, &offered.id).unwrap();
//! assert!(!engine.check_cooldown(&visitor).unwrap().allowed);
//! ```

pub mod cli;
pub mod clock;
pub mod engine;
pub mod error;
pub mod format;
pub mod models;
pub mod repository;
pub mod service;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{EngineOptions, GiftEngine, SAMPLE_COUPONS};
pub use error::{ErrorKind, GiftError, Result};
pub use format::format_time_left;
pub use models::{Claim, ClaimHistoryEntry, Coupon, DashboardStats, Identity};
pub use service::{COOLDOWN_WINDOW, CooldownStatus};
