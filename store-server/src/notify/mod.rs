//! 订单事件通知
//!
//! 邮件投递是外部协作方；服务端只在状态变更点发出通知事件。
//! 默认实现 [`LogNotifier`] 走结构化日志。

use async_trait::async_trait;

use crate::db::models::Order;

/// Order state-change notification boundary
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn payment_confirmed(&self, order: &Order);
    async fn payment_failed(&self, order: &Order);
    async fn order_canceled(&self, order: &Order);
    async fn refund_completed(&self, order: &Order);
}

/// Notifier that records events in the log stream
pub struct LogNotifier;

fn order_id(order: &Order) -> String {
    order
        .id
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_default()
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn payment_confirmed(&self, order: &Order) {
        tracing::info!(
            target: "notify",
            order_id = %order_id(order),
            tx_ref = %order.tx_ref,
            user = %order.user,
            "payment confirmed"
        );
    }

    async fn payment_failed(&self, order: &Order) {
        tracing::info!(
            target: "notify",
            order_id = %order_id(order),
            tx_ref = %order.tx_ref,
            user = %order.user,
            "payment failed"
        );
    }

    async fn order_canceled(&self, order: &Order) {
        tracing::info!(
            target: "notify",
            order_id = %order_id(order),
            tx_ref = %order.tx_ref,
            user = %order.user,
            "order canceled"
        );
    }

    async fn refund_completed(&self, order: &Order) {
        tracing::info!(
            target: "notify",
            order_id = %order_id(order),
            tx_ref = %order.tx_ref,
            user = %order.user,
            "refund completed"
        );
    }
}
