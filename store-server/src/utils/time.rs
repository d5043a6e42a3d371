//! 时间工具函数
//!
//! 所有持久化时间戳统一为 Unix millis (`i64`)，
//! repository 层只接收和返回 `i64`。

use chrono::Utc;

/// 当前时间的 Unix millis
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
