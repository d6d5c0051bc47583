//! 时间源抽象
//!
//! 冷却判断与时间戳都从注入的 [`Clock`] 读取，测试中可用 [`ManualClock`] 模拟时间流逝。

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// 时间源
pub trait Clock: Send + Sync + fmt::Debug {
    /// 当前 UTC 时间
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手动时钟
///
/// 时间只在调用 [`ManualClock::set`] 或 [`ManualClock::advance`] 时变化。
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// 设置当前时间
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock() = at;
    }

    /// 时间前进指定时长
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
