//! Order Repository
//!
//! 支付确认和取消都是多文档写 (订单状态 + 各行图书库存)，
//! 必须落在同一个事务里。两条路径都用状态字段上的条件更新做
//! CAS：前置状态不匹配时事务内不发生任何写入，调用方拿到
//! `None`。

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use shared::OrderStatus;

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::Order;
use crate::utils::time::now_millis;

const ORDER_TABLE: &str = "orders";

/// 标记支付成功并扣减库存（单事务）
///
/// CAS 条件: payment_status = 'pending'。库存扣减 clamp 到 0，
/// 绝不为负。
const MARK_PAID_SQL: &str = "\
BEGIN TRANSACTION;
LET $updated = (UPDATE orders SET payment_status = 'paid', order_status = 'processing', \
transaction_details = $details, updated_at = $now \
WHERE tx_ref = $tx_ref AND payment_status = 'pending' RETURN AFTER);
FOR $line IN array::flatten($updated.lines) {
    UPDATE type::record($line.book) \
    SET format.stock = math::max(format.stock - $line.quantity, 0), updated_at = $now \
    WHERE format.kind = 'physical';
};
RETURN $updated;
COMMIT TRANSACTION;";

/// 取消订单并回补库存（单事务）
///
/// CAS 条件: order_status = 'processing'。只有已支付的订单才
/// 回补库存 —— 未支付的订单从未扣减过。
const CANCEL_SQL: &str = "\
BEGIN TRANSACTION;
LET $updated = (UPDATE $record SET order_status = 'canceled', updated_at = $now \
WHERE order_status = 'processing' RETURN AFTER);
IF array::len($updated) > 0 && $updated[0].payment_status = 'paid' {
    FOR $line IN $updated[0].lines {
        UPDATE type::record($line.book) \
        SET format.stock = format.stock + $line.quantity, updated_at = $now \
        WHERE format.kind = 'physical';
    };
};
RETURN $updated;
COMMIT TRANSACTION;";

// =============================================================================
// Order Repository
// =============================================================================

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Persist a new order
    pub async fn create(&self, order: Order) -> RepoResult<Order> {
        let created: Option<Order> = self.base.db().create(ORDER_TABLE).content(order).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create order".to_string()))
    }

    /// Find order by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        let record = parse_record_id(ORDER_TABLE, id)?;
        let order: Option<Order> = self.base.db().select(record).await?;
        Ok(order)
    }

    /// Find order by gateway transaction reference
    pub async fn find_by_tx_ref(&self, tx_ref: &str) -> RepoResult<Option<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query("SELECT * FROM orders WHERE tx_ref = $tx_ref LIMIT 1")
            .bind(("tx_ref", tx_ref.to_string()))
            .await?
            .take(0)?;
        Ok(orders.into_iter().next())
    }

    /// All orders of one buyer, newest first
    pub async fn find_by_user(&self, user: &str) -> RepoResult<Vec<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query("SELECT * FROM orders WHERE user = $user ORDER BY created_at DESC")
            .bind(("user", user.to_string()))
            .await?
            .take(0)?;
        Ok(orders)
    }

    /// All orders (admin), newest first
    pub async fn find_all(&self, limit: i64, offset: i64) -> RepoResult<Vec<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query("SELECT * FROM orders ORDER BY created_at DESC LIMIT $limit START $offset")
            .bind(("limit", limit))
            .bind(("offset", offset))
            .await?
            .take(0)?;
        Ok(orders)
    }

    /// Open (pending or paid) orders of one buyer, for the duplicate-submission guard
    pub async fn find_open_by_user(&self, user: &str) -> RepoResult<Vec<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query(
                "SELECT * FROM orders WHERE user = $user \
                 AND payment_status IN ['pending', 'paid']",
            )
            .bind(("user", user.to_string()))
            .await?
            .take(0)?;
        Ok(orders)
    }

    /// Transition `pending → paid`, store the gateway payload and decrement
    /// stock for every line, all in one transaction.
    ///
    /// Returns `None` when the order was not in `pending` (already settled):
    /// nothing is written in that case, so repeated or concurrent verifies
    /// can never double-decrement.
    pub async fn mark_paid_and_decrement(
        &self,
        tx_ref: &str,
        details: serde_json::Value,
    ) -> RepoResult<Option<Order>> {
        let mut response = self
            .base
            .db()
            .query(MARK_PAID_SQL)
            .bind(("tx_ref", tx_ref.to_string()))
            .bind(("details", details))
            .bind(("now", now_millis()))
            .await?;

        let last = response.num_statements() - 1;
        let updated: Vec<Order> = response.take(last)?;
        Ok(updated.into_iter().next())
    }

    /// Transition `pending → failed`. No stock mutation. CAS on `pending`.
    pub async fn mark_failed(
        &self,
        tx_ref: &str,
        details: serde_json::Value,
    ) -> RepoResult<Option<Order>> {
        let updated: Vec<Order> = self
            .base
            .db()
            .query(
                "UPDATE orders SET payment_status = 'failed', \
                 transaction_details = $details, updated_at = $now \
                 WHERE tx_ref = $tx_ref AND payment_status = 'pending' RETURN AFTER",
            )
            .bind(("tx_ref", tx_ref.to_string()))
            .bind(("details", details))
            .bind(("now", now_millis()))
            .await?
            .take(0)?;
        Ok(updated.into_iter().next())
    }

    /// Cancel a `processing` order and restore stock (paid orders only) in
    /// one transaction. Returns `None` when the CAS guard did not match.
    pub async fn cancel_and_restore(&self, id: &str) -> RepoResult<Option<Order>> {
        let record = parse_record_id(ORDER_TABLE, id)?;

        let mut response = self
            .base
            .db()
            .query(CANCEL_SQL)
            .bind(("record", record))
            .bind(("now", now_millis()))
            .await?;

        let last = response.num_statements() - 1;
        let updated: Vec<Order> = response.take(last)?;
        Ok(updated.into_iter().next())
    }

    /// Seller/admin fulfillment transition with a CAS guard on the
    /// expected current status.
    pub async fn update_status(
        &self,
        id: &str,
        from: OrderStatus,
        to: OrderStatus,
    ) -> RepoResult<Option<Order>> {
        let record = parse_record_id(ORDER_TABLE, id)?;

        let updated: Vec<Order> = self
            .base
            .db()
            .query(
                "UPDATE $record SET order_status = $to, updated_at = $now \
                 WHERE order_status = $from RETURN AFTER",
            )
            .bind(("record", record))
            .bind(("from", from))
            .bind(("to", to))
            .bind(("now", now_millis()))
            .await?
            .take(0)?;
        Ok(updated.into_iter().next())
    }

    /// Record a completed refund from the gateway webhook (terminal)
    pub async fn record_refund(
        &self,
        tx_ref: &str,
        payload: serde_json::Value,
    ) -> RepoResult<Option<Order>> {
        let updated: Vec<Order> = self
            .base
            .db()
            .query(
                "UPDATE orders SET refund_status = 'completed', \
                 transaction_details = $payload, updated_at = $now \
                 WHERE tx_ref = $tx_ref RETURN AFTER",
            )
            .bind(("tx_ref", tx_ref.to_string()))
            .bind(("payload", payload))
            .bind(("now", now_millis()))
            .await?
            .take(0)?;
        Ok(updated.into_iter().next())
    }

    /// Hard delete (admin only)
    pub async fn delete(&self, id: &str) -> RepoResult<()> {
        let record = parse_record_id(ORDER_TABLE, id)?;
        let deleted: Option<Order> = self.base.db().delete(record).await?;
        if deleted.is_none() {
            return Err(RepoError::NotFound(format!("Order {} not found", id)));
        }
        Ok(())
    }

}
