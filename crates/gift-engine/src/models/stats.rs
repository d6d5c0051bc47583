//! 管理端统计与领取历史视图

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Claim, Coupon};

/// 仪表盘统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: usize,
    /// 启用且未使用
    pub active: usize,
    /// 已使用
    pub claimed: usize,
    /// 停用且未使用
    pub inactive: usize,
    /// 领取率（百分比，四舍五入）
    pub claim_rate: u32,
}

impl DashboardStats {
    pub fn from_coupons(coupons: &[Coupon]) -> Self {
        let total = coupons.len();
        let active = coupons.iter().filter(|c| c.is_available()).count();
        let claimed = coupons.iter().filter(|c| c.is_used).count();
        let inactive = coupons.iter().filter(|c| !c.is_active && !c.is_used).count();

        let claim_rate = if total > 0 {
            ((claimed as f64 / total as f64) * 100.0).round() as u32
        } else {
            0
        };

        Self {
            total,
            active,
            claimed,
            inactive,
            claim_rate,
        }
    }
}

/// 领取历史条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimHistoryEntry {
    pub claim_id: String,
    pub coupon_id: String,
    /// 券码，券已不存在时为 `Unknown`
    pub coupon_code: String,
    pub masked_ip: String,
    pub masked_session: String,
    pub timestamp: DateTime<Utc>,
}

impl ClaimHistoryEntry {
    pub fn from_claim(claim: &Claim, coupons: &[Coupon]) -> Self {
        let coupon_code = coupons
            .iter()
            .find(|c| c.id == claim.coupon_id)
            .map(|c| c.code.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        Self {
            claim_id: claim.id.clone(),
            coupon_id: claim.coupon_id.clone(),
            coupon_code,
            masked_ip: claim.identity.masked_ip(),
            masked_session: claim.identity.masked_session(),
            timestamp: claim.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;

    fn coupon(active: bool, used: bool) -> Coupon {
        let mut coupon = Coupon::new("CODE", "desc", Utc::now());
        coupon.is_active = active;
        if used {
            let claim = Claim::new(Identity::new("1.2.3.4", "s"), &coupon.id, Utc::now());
            coupon.mark_used(&claim).unwrap();
        }
        coupon
    }

    #[test]
    fn test_stats_counts() {
        let coupons = vec![
            coupon(true, false),
            coupon(true, true),
            coupon(false, false),
            coupon(false, true),
        ];
        let stats = DashboardStats::from_coupons(&coupons);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.claimed, 2);
        assert_eq!(stats.inactive, 1);
        assert_eq!(stats.claim_rate, 50);
    }

    #[test]
    fn test_stats_rounding_and_empty() {
        assert_eq!(DashboardStats::from_coupons(&[]), DashboardStats::default());

        let coupons = vec![coupon(true, true), coupon(true, true), coupon(true, false)];
        assert_eq!(DashboardStats::from_coupons(&coupons).claim_rate, 67);
    }

    #[test]
    fn test_history_entry_unknown_coupon() {
        let claim = Claim::new(Identity::new("10.1.2.3", "session_123456789"), "gone", Utc::now());
        let entry = ClaimHistoryEntry::from_claim(&claim, &[]);

        assert_eq!(entry.coupon_code, "Unknown");
        assert_eq!(entry.masked_ip, "10.1.***.***");
        assert_eq!(entry.masked_session, "session_...");
    }
}
