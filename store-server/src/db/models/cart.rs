//! Cart Model
//!
//! 每个用户一个购物车，首次加购时惰性创建。
//! `total_price` 为派生值，由 repository 在每次变更后重算。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use super::Book;
use super::serde_helpers;

/// Cart line item: record link + quantity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(with = "serde_helpers::record_id")]
    pub book: RecordId,
    pub quantity: i64,
}

/// Cart model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    /// Owning user (JWT subject), unique per cart
    pub user: String,
    #[serde(default)]
    pub lines: Vec<CartLine>,
    #[serde(default)]
    pub total_price: Decimal,
    #[serde(default)]
    pub updated_at: i64,
}

// =============================================================================
// API Response Types
// =============================================================================

/// Cart line joined with its current book
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub book: Book,
    pub quantity: i64,
    pub line_total: Decimal,
}

/// Cart with priced lines (unpriceable lines already pruned)
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total_price: Decimal,
}

impl CartView {
    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            total_price: Decimal::ZERO,
        }
    }
}
