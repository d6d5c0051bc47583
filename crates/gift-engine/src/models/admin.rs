//! 管理员档案

use serde::{Deserialize, Serialize};

/// 单一管理员档案
///
/// 密码以明文保存并做相等比较，仅作为管理端的边界约定。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub username: String,
    pub password: String,
}

impl AdminProfile {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}
