//! 内存存储
//!
//! 使用 DashMap 实现的高并发内存存储，适用于测试和开发环境。

use dashmap::DashMap;
use std::sync::Arc;

use super::KvStore;
use crate::error::Result;

/// 内存键值存储
///
/// 基于 DashMap 实现，克隆后共享同一份数据。
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    data: Arc<DashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// 创建新的内存存储实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 检查是否存在指定 key
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// 获取数据总数
    pub fn count(&self) -> usize {
        self.data.len()
    }
}

impl KvStore for MemoryStore {
    /// 返回数据的克隆，不持有分片锁
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(key).map(|v| v.value().clone()))
    }

    /// 如果 key 已存在则覆盖原有数据
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.data.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_get_set() {
        let store = MemoryStore::new();
        assert!(store.get("coupons").unwrap().is_none());

        store.set("coupons", b"[]").unwrap();
        assert_eq!(store.get("coupons").unwrap().as_deref(), Some(&b"[]"[..]));

        // 覆盖
        store.set("coupons", b"[1]").unwrap();
        assert_eq!(store.get("coupons").unwrap().as_deref(), Some(&b"[1]"[..]));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_memory_store_clone_shares_data() {
        let store = MemoryStore::new();
        let cloned = store.clone();

        store.set("claims", b"[]").unwrap();
        assert!(cloned.contains("claims"));

        cloned.set("claims", b"[\"c1\"]").unwrap();
        assert_eq!(
            store.get("claims").unwrap().as_deref(),
            Some(&b"[\"c1\"]"[..])
        );
        assert_eq!(store.count(), 1);
    }
}
