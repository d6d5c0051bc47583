//! 面向展示的格式化

use std::time::Duration;

/// 剩余冷却时间的可读形式
///
/// 不足一分钟的部分舍去：`0 minutes`、`1 minute`、`2 hours and 1 minute`。
pub fn format_time_left(remaining: Duration) -> String {
    let total_minutes = remaining.as_secs() / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours > 0 {
        format!("{} and {}", plural(hours, "hour"), plural(minutes, "minute"))
    } else {
        plural(minutes, "minute")
    }
}

fn plural(count: u64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}
