//! 存储事务
//!
//! 写入先暂存在内存，提交时一次性落到后端。后端写入中途失败时，
//! 把已写入的键恢复为提交前的值，调用方看到的存储与事务开始前一致。

use std::collections::BTreeMap;

use parking_lot::RwLockWriteGuard;
use serde::Serialize;
use tracing::{debug, error, warn};

use super::{KvRead, KvStore};
use crate::error::{GiftError, Result};

/// 独占事务
///
/// 持有存储写锁直到提交或丢弃；丢弃未提交的事务不会产生任何写入。
pub struct Transaction<'a> {
    backend: &'a dyn KvStore,
    staged: BTreeMap<String, Vec<u8>>,
    _guard: RwLockWriteGuard<'a, ()>,
}

impl<'a> Transaction<'a> {
    pub(super) fn new(backend: &'a dyn KvStore, guard: RwLockWriteGuard<'a, ()>) -> Self {
        Self {
            backend,
            staged: BTreeMap::new(),
            _guard: guard,
        }
    }

    /// 暂存 JSON 值
    pub fn put_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.staged.insert(key.to_string(), bytes);
        Ok(())
    }

    /// 是否没有待提交的写入
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// 提交
    ///
    /// 写入失败时返回原始错误；若回滚本身也有键未能恢复，返回 `Storage` 错误并列出这些键，
    /// 此时存储可能处于部分写入状态。
    pub fn commit(self) -> Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }

        // 先记录所有待写键的旧值，写入失败时据此回滚
        let mut priors = Vec::with_capacity(self.staged.len());
        for key in self.staged.keys() {
            priors.push((key.as_str(), self.backend.get(key)?));
        }

        for (written, (key, value)) in self.staged.iter().enumerate() {
            if let Err(e) = self.backend.set(key, value) {
                warn!(key = %key, error = %e, "Store write failed, rolling back transaction");
                let unrestored = self.rollback(&priors[..written]);
                if !unrestored.is_empty() {
                    return Err(GiftError::Storage(format!(
                        "写入失败且回滚不完整: {}; 未恢复的键: {:?}",
                        e, unrestored
                    )));
                }
                return Err(e);
            }
        }

        debug!(keys = self.staged.len(), "Transaction committed");
        Ok(())
    }

    /// 逆序恢复已写入的键，返回未能恢复的键
    fn rollback(&self, applied: &[(&str, Option<Vec<u8>>)]) -> Vec<String> {
        let mut unrestored = Vec::new();
        for (key, prior) in applied.iter().rev() {
            // 后端没有删除操作，原本不存在的键写入 null 墓碑
            let bytes = prior.as_deref().unwrap_or(b"null".as_slice());
            if let Err(e) = self.backend.set(key, bytes) {
                error!(key = %key, error = %e, "Failed to restore key during rollback");
                unrestored.push(key.to_string());
            }
        }
        unrestored
    }
}

impl KvRead for Transaction<'_> {
    /// 优先读取本事务暂存的值
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.staged.get(key) {
            Some(bytes) => Ok(Some(bytes.clone())),
            None => self.backend.get(key),
        }
    }
}
