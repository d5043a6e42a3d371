//! Settings Model
//!
//! 单条设置文档，固定 id (`settings:store`)。
//! 每个请求显式读取，不做进程内全局缓存。

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use super::serde_helpers;

/// Store-wide settings document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    /// Checkout is refused while maintenance mode is on
    #[serde(default)]
    pub maintenance_mode: bool,
    /// Optional operator message shown to clients
    #[serde(default)]
    pub maintenance_message: Option<String>,
    #[serde(default)]
    pub updated_at: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            id: None,
            maintenance_mode: false,
            maintenance_message: None,
            updated_at: 0,
        }
    }
}
