//! 订单生命周期类型
//!
//! 支付状态与配送状态相互独立：
//! - [`PaymentStatus`] 由支付网关对账驱动 (pending → paid | failed)
//! - [`OrderStatus`] 由卖家推进 (processing → shipped → delivered)，
//!   取消仅允许在 processing 阶段
//! - [`RefundStatus`] 由异步 webhook 写入，completed 为终态

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payment state of an order, driven by gateway reconciliation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

/// Fulfillment state of an order, driven by the seller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
    Canceled,
}

/// Refund state, written from the asynchronous gateway webhook.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    #[default]
    None,
    Completed,
}

/// Rejected fulfillment transition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid order status transition: {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatus {
    /// 配送状态机：processing → shipped → delivered，
    /// canceled 只能从 processing 进入。终态不可离开。
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Processing, Shipped) | (Shipped, Delivered) | (Processing, Canceled)
        )
    }

    /// Validate a seller/admin driven transition.
    pub fn transition_to(self, next: OrderStatus) -> Result<OrderStatus, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Terminal states cannot be re-opened.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Canceled)
    }
}
