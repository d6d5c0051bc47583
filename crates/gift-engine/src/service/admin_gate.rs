//! 管理员凭证校验
//!
//! 与存储中唯一的管理员档案做明文相等比较。

use tracing::{info, warn};

use crate::error::{GiftError, Result};
use crate::models::AdminProfile;
use crate::store::{KvRead, SharedStore, Transaction, keys};

#[derive(Debug, Clone)]
pub struct AdminGate {
    store: SharedStore,
}

impl AdminGate {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// 凭证是否匹配；尚未初始化管理员档案时一律不匹配
    pub fn validate(&self, username: &str, password: &str) -> Result<bool> {
        let profile = Self::load(&self.store.read())?;
        Ok(profile.is_some_and(|p| p.matches(username, password)))
    }

    /// 校验凭证，不匹配时返回 `InvalidCredentials`
    pub fn authenticate(&self, username: &str, password: &str) -> Result<()> {
        if self.validate(username, password)? {
            info!(username = %username, "Admin authenticated");
            Ok(())
        } else {
            warn!(username = %username, "Admin authentication failed");
            Err(GiftError::InvalidCredentials)
        }
    }

    pub fn load<R: KvRead>(reader: &R) -> Result<Option<AdminProfile>> {
        reader.get_json(keys::ADMIN)
    }

    /// 档案不存在时写入，返回是否写入
    pub fn seed_in_tx(tx: &mut Transaction<'_>, profile: &AdminProfile) -> Result<bool> {
        if Self::load(tx)?.is_some() {
            return Ok(false);
        }
        tx.put_json(keys::ADMIN, profile)?;
        Ok(true)
    }
}
