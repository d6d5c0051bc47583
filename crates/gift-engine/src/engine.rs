//! 领券引擎门面
//!
//! 把仓储与服务组装在同一个 [`SharedStore`] 与 [`Clock`] 上，对外提供全部边界操作。

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use gift_shared::config::{AppConfig, RotationPolicy, StoreBackend};

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::models::{AdminProfile, Claim, ClaimHistoryEntry, Coupon, DashboardStats, Identity};
use crate::repository::{ClaimLedger, ClaimedSets, CouponRegistry};
use crate::service::{
    AdminGate, AllocationService, CooldownGuard, CooldownStatus, Distributor, INITIAL_CURSOR,
};
use crate::store::{FileStore, KvRead, SharedStore, keys};

/// 示例优惠券（券码, 描述）
pub const SAMPLE_COUPONS: [(&str, &str); 3] = [
    ("FREE10", "10% off your first purchase"),
    ("WELCOME20", "20% off for new customers"),
    ("SUMMER15", "15% off summer collection"),
];

/// 引擎选项
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub rotation: RotationPolicy,
    /// 首次初始化写入的管理员档案
    pub admin: AdminProfile,
    pub seed_sample_coupons: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            rotation: RotationPolicy::default(),
            admin: AdminProfile::new("admin", "admin123"),
            seed_sample_coupons: false,
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            rotation: config.distribution.rotation,
            admin: AdminProfile::new(&config.admin.username, &config.admin.password),
            seed_sample_coupons: config.store.seed_sample_coupons,
        }
    }

    pub fn with_rotation(mut self, rotation: RotationPolicy) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_sample_coupons(mut self, seed: bool) -> Self {
        self.seed_sample_coupons = seed;
        self
    }
}

/// 领券引擎
#[derive(Debug, Clone)]
pub struct GiftEngine {
    store: SharedStore,
    clock: Arc<dyn Clock>,
    options: EngineOptions,
    registry: CouponRegistry,
    ledger: ClaimLedger,
    cooldown: CooldownGuard,
    distributor: Distributor,
    allocation: AllocationService,
    admin: AdminGate,
}

impl GiftEngine {
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>, options: EngineOptions) -> Self {
        Self {
            registry: CouponRegistry::new(store.clone(), clock.clone()),
            ledger: ClaimLedger::new(store.clone(), clock.clone()),
            cooldown: CooldownGuard::new(store.clone(), clock.clone()),
            distributor: Distributor::new(store.clone(), options.rotation),
            allocation: AllocationService::new(store.clone(), clock.clone()),
            admin: AdminGate::new(store.clone()),
            store,
            clock,
            options,
        }
    }

    /// 内存存储 + 系统时钟
    pub fn in_memory(options: EngineOptions) -> Self {
        Self::new(SharedStore::memory(), Arc::new(SystemClock), options)
    }

    /// 按应用配置选择存储后端
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store = match config.store.backend {
            StoreBackend::Memory => SharedStore::memory(),
            StoreBackend::File => {
                SharedStore::new(Arc::new(FileStore::open(&config.store.data_dir)?))
            }
        };

        info!(
            backend = ?config.store.backend,
            data_dir = %config.store.data_dir.display(),
            rotation = ?config.distribution.rotation,
            "Gift engine created"
        );
        Ok(Self::new(
            store,
            Arc::new(SystemClock),
            EngineOptions::from_config(config),
        ))
    }

    /// 首次运行时写入缺失的键，已有的键保持不变
    ///
    /// 返回本次是否写入了任何键。
    pub fn initialize(&self) -> Result<bool> {
        self.initialize_with(self.options.seed_sample_coupons)
    }

    /// 同 [`GiftEngine::initialize`]，由调用方决定优惠券集合缺失时是否写入示例券
    #[instrument(skip(self))]
    pub fn initialize_with(&self, seed_samples: bool) -> Result<bool> {
        let mut tx = self.store.begin();

        if tx.is_absent(keys::COUPONS)? {
            let now = self.clock.now();
            let coupons: Vec<Coupon> = if seed_samples {
                SAMPLE_COUPONS
                    .iter()
                    .map(|(code, description)| Coupon::new(*code, *description, now))
                    .collect()
            } else {
                Vec::new()
            };
            tx.put_json(keys::COUPONS, &coupons)?;
        }
        if tx.is_absent(keys::CLAIMS)? {
            tx.put_json(keys::CLAIMS, &Vec::<Claim>::new())?;
        }
        if tx.is_absent(keys::ROTATION_CURSOR)? {
            tx.put_json(keys::ROTATION_CURSOR, &INITIAL_CURSOR)?;
        }
        if tx.is_absent(keys::CLAIMED_SETS)? {
            tx.put_json(keys::CLAIMED_SETS, &ClaimedSets::new())?;
        }
        AdminGate::seed_in_tx(&mut tx, &self.options.admin)?;
        if tx.is_absent(keys::SESSION_TOKEN)? {
            tx.put_json(keys::SESSION_TOKEN, &new_session_token())?;
        }

        let seeded = !tx.is_empty();
        tx.commit()?;

        if seeded {
            info!(samples = seed_samples, "Store initialized");
        }
        Ok(seeded)
    }

    // ==================== 优惠券管理 ====================

    pub fn list_coupons(&self) -> Result<Vec<Coupon>> {
        self.registry.list()
    }

    pub fn add_coupon(&self, code: &str, description: &str) -> Result<Coupon> {
        self.registry.add(code, description)
    }

    pub fn edit_coupon(&self, id: &str, code: &str, description: &str) -> Result<Coupon> {
        self.registry.edit(id, code, description)
    }

    pub fn toggle_active(&self, id: &str) -> Result<Coupon> {
        self.registry.toggle_active(id)
    }

    // ==================== 发放与领取 ====================

    pub fn check_cooldown(&self, identity: &Identity) -> Result<CooldownStatus> {
        self.cooldown.check(identity)
    }

    pub fn next_coupon(&self, identity: &Identity) -> Result<Option<Coupon>> {
        self.distributor.next(identity)
    }

    pub fn claim(&self, identity: &Identity, coupon_id: &str) -> Result<Claim> {
        self.allocation.claim(identity, coupon_id)
    }

    // ==================== 管理端 ====================

    pub fn validate_admin(&self, username: &str, password: &str) -> Result<bool> {
        self.admin.validate(username, password)
    }

    pub fn authenticate_admin(&self, username: &str, password: &str) -> Result<()> {
        self.admin.authenticate(username, password)
    }

    pub fn stats(&self) -> Result<DashboardStats> {
        Ok(DashboardStats::from_coupons(&self.registry.list()?))
    }

    /// 领取历史（最新在前）
    pub fn claim_history(&self) -> Result<Vec<ClaimHistoryEntry>> {
        let view = self.store.read();
        let coupons = CouponRegistry::load(&view)?;
        let claims = ClaimLedger::load(&view)?;

        Ok(claims
            .iter()
            .rev()
            .map(|claim| ClaimHistoryEntry::from_claim(claim, &coupons))
            .collect())
    }

    /// 本机调用方的会话令牌，不存在时生成并保存
    pub fn session_token(&self) -> Result<String> {
        if let Some(token) = self.store.read().get_json::<String>(keys::SESSION_TOKEN)? {
            return Ok(token);
        }

        let mut tx = self.store.begin();
        // 等锁期间可能已被其他调用方写入
        if let Some(token) = tx.get_json::<String>(keys::SESSION_TOKEN)? {
            return Ok(token);
        }
        let token = new_session_token();
        tx.put_json(keys::SESSION_TOKEN, &token)?;
        tx.commit()?;
        Ok(token)
    }

    // ==================== 组件访问 ====================

    pub fn registry(&self) -> &CouponRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &ClaimLedger {
        &self.ledger
    }

    pub fn distributor(&self) -> &Distributor {
        &self.distributor
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }
}

fn new_session_token() -> String {
    format!("session_{}", Uuid::new_v4().simple())
}
