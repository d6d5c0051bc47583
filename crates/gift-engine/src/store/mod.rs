//! 持久化存储层
//!
//! 引擎只依赖一个最小的键值接口（`get` / `set`），具体存储技术由外部决定。
//!
//! ## 设计原则
//!
//! - 值统一以 JSON 编码
//! - 所有变更都经由 [`Transaction`]，持有同一把写锁，保证读-检查-写序列串行执行
//! - 读操作通过 [`ReadView`] 持有读锁，看不到提交到一半的状态

mod file_store;
mod memory_store;
mod transaction;

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use serde::de::DeserializeOwned;

use crate::error::Result;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use transaction::Transaction;

/// 逻辑键
pub mod keys {
    /// 优惠券集合
    pub const COUPONS: &str = "coupons";
    /// 领取记录（只追加）
    pub const CLAIMS: &str = "claims";
    /// 轮转游标
    pub const ROTATION_CURSOR: &str = "last_distributed_index";
    /// 精确身份键 -> 已领取的券 ID 列表
    pub const CLAIMED_SETS: &str = "user_claimed_coupons";
    /// 管理员档案
    pub const ADMIN: &str = "admin";
    /// 本机调用方的会话令牌
    pub const SESSION_TOKEN: &str = "session_id";
}

/// 键值存储接口
#[cfg_attr(test, mockall::automock)]
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;
}

/// 可读视图
///
/// 由 [`ReadView`] 与 [`Transaction`] 实现，仓储的读取函数对两者通用。
pub trait KvRead {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 读取并解析 JSON 值
    ///
    /// 值为 `null` 时与键不存在等同，事务回滚用它作为墓碑。
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key)? {
            Some(bytes) => Ok(serde_json::from_slice::<Option<T>>(&bytes)?),
            None => Ok(None),
        }
    }

    /// 键是否有值
    fn is_absent(&self, key: &str) -> Result<bool> {
        Ok(self.get_json::<serde_json::Value>(key)?.is_none())
    }
}

/// 带锁的共享存储句柄
///
/// 克隆后共享同一后端与同一把锁。
#[derive(Clone)]
pub struct SharedStore {
    backend: Arc<dyn KvStore>,
    lock: Arc<RwLock<()>>,
}

impl SharedStore {
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self {
            backend,
            lock: Arc::new(RwLock::new(())),
        }
    }

    /// 使用内存后端
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// 获取读视图（共享锁）
    pub fn read(&self) -> ReadView<'_> {
        ReadView {
            backend: self.backend.as_ref(),
            _guard: self.lock.read(),
        }
    }

    /// 开启事务（独占锁，直到提交或丢弃）
    pub fn begin(&self) -> Transaction<'_> {
        Transaction::new(self.backend.as_ref(), self.lock.write())
    }
}

impl fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedStore").finish_non_exhaustive()
    }
}

/// 读视图
pub struct ReadView<'a> {
    backend: &'a dyn KvStore,
    _guard: RwLockReadGuard<'a, ()>,
}

impl KvRead for ReadView<'_> {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.backend.get(key)
    }
}
