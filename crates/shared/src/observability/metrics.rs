//! Prometheus 指标模块
//!
//! 基于 metrics crate 记录领域指标；需要导出时安装 metrics-exporter-prometheus 记录器，
//! 由调用方渲染文本快照。

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Metrics 资源句柄
pub struct MetricsHandle {
    handle: PrometheusHandle,
}

impl MetricsHandle {
    /// 渲染 Prometheus 文本格式快照
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// 安装全局 Prometheus 记录器
pub fn init(service_name: &str) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_metrics();
    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);

    Ok(MetricsHandle { handle })
}

/// 注册指标描述
///
/// 这些描述会出现在导出文本的 HELP 注释中
pub fn describe_metrics() {
    metrics::describe_counter!("coupon_offers_total", "Total number of coupon offers");
    metrics::describe_counter!("coupon_claims_total", "Total number of accepted claims");
    metrics::describe_counter!(
        "coupon_claim_rejections_total",
        "Total number of rejected claims by reason"
    );
    metrics::describe_counter!(
        "coupon_cooldown_checks_total",
        "Total number of cooldown evaluations"
    );
    metrics::describe_counter!("coupon_admin_changes_total", "Total number of admin changes");
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录一次发放（offer）
#[inline]
pub fn record_offer(found: bool) {
    metrics::counter!("coupon_offers_total", "found" => found.to_string()).increment(1);
}

/// 记录一次成功领取
#[inline]
pub fn record_claim() {
    metrics::counter!("coupon_claims_total").increment(1);
}

/// 记录一次被拒绝的领取
#[inline]
pub fn record_claim_rejection(reason: &'static str) {
    metrics::counter!("coupon_claim_rejections_total", "reason" => reason).increment(1);
}

/// 记录冷却检查
#[inline]
pub fn record_cooldown_check(allowed: bool) {
    metrics::counter!("coupon_cooldown_checks_total", "allowed" => allowed.to_string())
        .increment(1);
}

/// 记录管理端变更
#[inline]
pub fn record_admin_change(action: &'static str) {
    metrics::counter!("coupon_admin_changes_total", "action" => action).increment(1);
}
