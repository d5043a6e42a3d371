//! Order Model
//!
//! 订单持久化下单瞬间的快照：行项目里的价格和卖家在 checkout
//! 时定格，与图书后续变更解耦。`tx_ref` 是与支付网关对账的
//! 全局唯一键，必须逐字节保持。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{OrderStatus, PaymentStatus, RefundStatus};
use surrealdb::RecordId;

use super::serde_helpers;

/// Denormalized order line, captured at checkout time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(with = "serde_helpers::record_id")]
    pub book: RecordId,
    pub title: String,
    /// Seller at checkout time
    pub seller: String,
    pub quantity: i64,
    /// Unit price at checkout time
    pub unit_price: Decimal,
}

impl OrderLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    /// Owning buyer (JWT subject)
    pub user: String,
    pub lines: Vec<OrderLine>,
    pub total_price: Decimal,
    pub shipping_address: String,
    /// Gateway join key, globally unique
    pub tx_ref: String,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    #[serde(default)]
    pub refund_status: RefundStatus,
    /// Opaque gateway payload, stored verbatim on verify / webhook
    #[serde(default)]
    pub transaction_details: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Order {
    /// Book ids covered by this order (for duplicate matching)
    pub fn book_quantities(&self) -> Vec<(String, i64)> {
        self.lines
            .iter()
            .map(|l| (l.book.to_string(), l.quantity))
            .collect()
    }
}

// =============================================================================
// API Response Types
// =============================================================================

/// Order as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: String,
    pub user: String,
    pub lines: Vec<OrderLine>,
    pub total_price: Decimal,
    pub shipping_address: String,
    pub tx_ref: String,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub refund_status: RefundStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.map(|id| id.to_string()).unwrap_or_default(),
            user: order.user,
            lines: order.lines,
            total_price: order.total_price,
            shipping_address: order.shipping_address,
            tx_ref: order.tx_ref,
            payment_status: order.payment_status,
            order_status: order.order_status,
            refund_status: order.refund_status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}
