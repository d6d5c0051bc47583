//! 统一可观测性模块
//!
//! 提供 logging、metrics 的统一初始化。
//! 所有二进制通过单一入口点配置可观测性，确保一致的日志格式与指标命名。

pub mod metrics;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;

use crate::config::ObservabilityConfig;

/// 可观测性资源守卫
///
/// 持有 Prometheus 记录器句柄（若已安装），Drop 时输出关闭日志。
pub struct ObservabilityGuard {
    metrics_handle: Option<metrics::MetricsHandle>,
}

impl ObservabilityGuard {
    /// 创建一个空的 Guard（用于测试或禁用可观测性时）
    pub fn empty() -> Self {
        Self {
            metrics_handle: None,
        }
    }

    /// 渲染当前指标快照（Prometheus 文本格式）
    ///
    /// 未安装记录器时返回 None。
    pub fn render_metrics(&self) -> Option<String> {
        self.metrics_handle.as_ref().map(|handle| handle.render())
    }
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        if self.metrics_handle.is_some() {
            info!("Shutting down observability...");
        }
    }
}

/// 统一初始化可观测性
///
/// 初始化顺序：
/// 1. Tracing（日志）
/// 2. Metrics（仅在 `with_metrics` 为 true 时安装 Prometheus 记录器）
///
/// # Example
///
/// ```ignore
/// use gift_shared::config::AppConfig;
/// use gift_shared::observability;
///
/// fn main() -> anyhow::Result<()> {
///     let config = AppConfig::load("gift-engine")?;
///     let _guard = observability::init(&config.service_name, &config.observability, false)?;
///     Ok(())
/// }
/// ```
pub fn init(
    service_name: &str,
    config: &ObservabilityConfig,
    with_metrics: bool,
) -> Result<ObservabilityGuard> {
    tracing::init(config)?;

    let metrics_handle = if with_metrics {
        Some(metrics::init(service_name)?)
    } else {
        metrics::describe_metrics();
        None
    };

    info!(
        service = %service_name,
        log_format = %config.log_format,
        metrics = with_metrics,
        "Observability initialized"
    );

    Ok(ObservabilityGuard { metrics_handle })
}
