//! OrderService - order lifecycle management
//!
//! # Checkout Flow
//!
//! ```text
//! create_order(user, book_ids, address)
//!     ├─ 1. Maintenance gate
//!     ├─ 2. Validate selection against catalog and cart
//!     ├─ 3. Duplicate-submission guard (open orders, set equality)
//!     ├─ 4. Snapshot lines, compute total (Decimal)
//!     ├─ 5. Persist order (payment_status = pending)
//!     ├─ 6. Gateway initialize_charge → checkout_url
//!     └─ 7. Prune purchased lines from the cart
//! ```
//!
//! # Reconciliation
//!
//! `verify_payment` 对同一 tx_ref 串行化 (per-tx_ref mutex)，
//! 状态推进本身又是数据库内的条件更新，重复/并发调用只会
//! 扣减一次库存。网关初始化失败时 pending 订单保留在库里，
//! 等待对账清扫，不自动回滚。

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use surrealdb::RecordId;
use tokio::sync::Mutex;
use uuid::Uuid;

use shared::{OrderStatus, PaymentStatus};

use crate::auth::CurrentUser;
use crate::db::models::{Book, Order, OrderLine, OrderView};
use crate::db::repository::{
    BookRepository, CartRepository, OrderRepository, SettingsRepository,
};
use crate::notify::Notifier;
use crate::payment::{ChargeStatus, InitializeCharge, PaymentGateway};
use crate::utils::time::now_millis;
use crate::utils::validation::{MAX_ADDRESS_LEN, validate_required_text};
use crate::utils::{AppError, AppResult};

/// Checkout result: the persisted order plus the gateway's hosted
/// checkout URL the client is redirected to.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub order: OrderView,
    pub checkout_url: String,
}

/// Order lifecycle manager
pub struct OrderService {
    orders: OrderRepository,
    books: BookRepository,
    carts: CartRepository,
    settings: SettingsRepository,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    /// Serializes concurrent verifies per tx_ref
    verify_locks: DashMap<String, Arc<Mutex<()>>>,
    currency: String,
    public_base_url: String,
}

impl OrderService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        orders: OrderRepository,
        books: BookRepository,
        carts: CartRepository,
        settings: SettingsRepository,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        currency: String,
        public_base_url: String,
    ) -> Self {
        Self {
            orders,
            books,
            carts,
            settings,
            gateway,
            notifier,
            verify_locks: DashMap::new(),
            currency,
            public_base_url,
        }
    }

    // ── Checkout ────────────────────────────────────────────────────

    /// Create a pending order from the user's cart selection and
    /// initialize the gateway charge.
    pub async fn create_order(
        &self,
        user: &CurrentUser,
        book_ids: &[String],
        shipping_address: &str,
    ) -> AppResult<CheckoutResponse> {
        // Maintenance gate: settings are read per request, not cached
        let settings = self.settings.load().await?;
        if settings.maintenance_mode {
            return Err(AppError::Maintenance);
        }

        validate_required_text(shipping_address, "shipping_address", MAX_ADDRESS_LEN)?;
        if book_ids.is_empty() {
            return Err(AppError::validation("book selection must not be empty"));
        }

        let mut selected: Vec<RecordId> = Vec::with_capacity(book_ids.len());
        for raw in book_ids {
            let id = crate::db::repository::parse_record_id("book", raw)?;
            if !selected.contains(&id) {
                selected.push(id);
            }
        }

        // The selection must come out of the user's cart
        let cart = self
            .carts
            .find_by_user(&user.id)
            .await?
            .ok_or_else(|| AppError::validation("cart is empty"))?;

        let mut quantities: HashMap<String, i64> = HashMap::new();
        for id in &selected {
            let line = cart
                .lines
                .iter()
                .find(|l| l.book == *id)
                .ok_or_else(|| {
                    AppError::validation(format!("book {} is not in the cart", id))
                })?;
            if line.quantity <= 0 {
                return Err(AppError::validation(format!(
                    "book {} has no quantity in the cart",
                    id
                )));
            }
            quantities.insert(id.to_string(), line.quantity);
        }

        // Every selected id must exist and be purchasable
        let books = self.books.find_many(&selected).await?;
        if books.len() != selected.len() {
            return Err(AppError::validation("one or more books do not exist"));
        }
        let books_by_id: HashMap<String, Book> = books
            .into_iter()
            .filter_map(|b| b.id.clone().map(|id| (id.to_string(), b)))
            .collect();

        for id in &selected {
            let key = id.to_string();
            let book = books_by_id
                .get(&key)
                .ok_or_else(|| AppError::validation(format!("book {} does not exist", id)))?;
            if !book.is_active {
                return Err(AppError::validation(format!(
                    "book '{}' is no longer available",
                    book.title
                )));
            }
            let quantity = quantities[&key];
            if let Some(stock) = book.format.stock()
                && stock < quantity
            {
                return Err(AppError::validation(format!(
                    "insufficient stock for '{}' ({} available)",
                    book.title, stock
                )));
            }
        }

        // Duplicate-submission guard: same set of books with the same
        // quantities while a prior order is still pending or paid.
        // Best effort: two concurrent submissions of the same cart can
        // still race past this check.
        let open = self.orders.find_open_by_user(&user.id).await?;
        if let Some(existing) = open.iter().find(|o| same_selection(o, &quantities)) {
            let existing_id = existing
                .id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_default();
            return Err(AppError::conflict(format!(
                "redundant order: an identical order already exists ({existing_id})"
            )));
        }

        // Snapshot the lines at this instant; later book mutations do
        // not touch existing orders.
        let mut lines = Vec::with_capacity(selected.len());
        let mut total = Decimal::ZERO;
        for id in &selected {
            let key = id.to_string();
            let book = &books_by_id[&key];
            let quantity = quantities[&key];
            total += book.price * Decimal::from(quantity);
            lines.push(OrderLine {
                book: id.clone(),
                title: book.title.clone(),
                seller: book.seller.clone(),
                quantity,
                unit_price: book.price,
            });
        }

        let tx_ref = generate_tx_ref(&user.id);
        let now = now_millis();
        let order = Order {
            id: None,
            user: user.id.clone(),
            lines,
            total_price: total,
            shipping_address: shipping_address.to_string(),
            tx_ref: tx_ref.clone(),
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Processing,
            refund_status: Default::default(),
            transaction_details: None,
            created_at: now,
            updated_at: now,
        };

        let order = self.orders.create(order).await?;
        let order_id = order
            .id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_default();

        // Gateway initialization. On failure the pending order stays
        // persisted and unconfirmed; a reconciliation sweep or manual
        // cleanup picks it up; there is no automatic rollback or retry.
        let checkout_url = match self
            .gateway
            .initialize_charge(InitializeCharge {
                amount: total,
                currency: self.currency.clone(),
                tx_ref: tx_ref.clone(),
                email: user.email.clone(),
                callback_url: format!(
                    "{}/api/orders/payment-callback?tx_ref={}",
                    self.public_base_url, tx_ref
                ),
                return_url: format!(
                    "{}/api/orders/payment-success?tx_ref={}",
                    self.public_base_url, tx_ref
                ),
            })
            .await
        {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(
                    order_id = %order_id,
                    tx_ref = %tx_ref,
                    error = %e,
                    "charge initialization failed, pending order left for reconciliation"
                );
                return Err(e.into());
            }
        };

        // Purchased lines leave the cart; the cart itself is kept
        self.carts.remove_lines(&user.id, &selected).await?;

        tracing::info!(order_id = %order_id, tx_ref = %tx_ref, total = %total, "order created");

        Ok(CheckoutResponse {
            order: order.into(),
            checkout_url,
        })
    }

    // ── Reconciliation ──────────────────────────────────────────────

    /// Reconcile an order with the gateway's authoritative status.
    ///
    /// Idempotent: an order that is already paid or failed is returned
    /// unchanged; stock is decremented at most once per tx_ref.
    pub async fn verify_payment(&self, tx_ref: &str) -> AppResult<Order> {
        let lock = self
            .verify_locks
            .entry(tx_ref.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let order = self
            .orders
            .find_by_tx_ref(tx_ref)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order with tx_ref {tx_ref} not found")))?;

        // Already settled, nothing to do
        if order.payment_status != PaymentStatus::Pending {
            self.verify_locks.remove(tx_ref);
            return Ok(order);
        }

        let verification = self.gateway.verify_transaction(tx_ref).await?;

        let settled = match verification.status {
            ChargeStatus::Success => {
                match self
                    .orders
                    .mark_paid_and_decrement(tx_ref, verification.raw)
                    .await?
                {
                    Some(updated) => {
                        tracing::info!(tx_ref = %tx_ref, "payment confirmed, stock decremented");
                        self.notifier.payment_confirmed(&updated).await;
                        updated
                    }
                    // Conditional update lost against a concurrent settle
                    None => self
                        .orders
                        .find_by_tx_ref(tx_ref)
                        .await?
                        .ok_or_else(|| AppError::not_found(format!(
                            "Order with tx_ref {tx_ref} not found"
                        )))?,
                }
            }
            ChargeStatus::Failed => {
                match self.orders.mark_failed(tx_ref, verification.raw).await? {
                    Some(updated) => {
                        tracing::warn!(tx_ref = %tx_ref, "payment failed");
                        self.notifier.payment_failed(&updated).await;
                        updated
                    }
                    None => self
                        .orders
                        .find_by_tx_ref(tx_ref)
                        .await?
                        .ok_or_else(|| AppError::not_found(format!(
                            "Order with tx_ref {tx_ref} not found"
                        )))?,
                }
            }
        };

        self.verify_locks.remove(tx_ref);
        Ok(settled)
    }

    /// Confirmation payload for the success page: stored transaction
    /// details, or a fresh verify when the callback has not landed yet.
    pub async fn payment_success(&self, tx_ref: &str) -> AppResult<Order> {
        let order = self
            .orders
            .find_by_tx_ref(tx_ref)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order with tx_ref {tx_ref} not found")))?;

        if order.payment_status == PaymentStatus::Pending {
            return self.verify_payment(tx_ref).await;
        }
        Ok(order)
    }

    // ── Cancellation & fulfillment ──────────────────────────────────

    /// Owner-only cancel, allowed only while the order is `processing`.
    /// Restores stock for paid orders inside the same transaction.
    pub async fn cancel_order(&self, user: &CurrentUser, order_id: &str) -> AppResult<Order> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {order_id} not found")))?;

        if order.user != user.id {
            return Err(AppError::forbidden("only the order owner may cancel"));
        }
        if order.order_status != OrderStatus::Processing {
            return Err(AppError::conflict(format!(
                "order cannot be canceled in status {:?}",
                order.order_status
            )));
        }

        match self.orders.cancel_and_restore(order_id).await? {
            Some(updated) => {
                tracing::info!(order_id = %order_id, "order canceled, stock restored");
                self.notifier.order_canceled(&updated).await;
                Ok(updated)
            }
            // Lost the race against a concurrent status change
            None => Err(AppError::conflict("order is no longer cancelable")),
        }
    }

    /// Seller/admin fulfillment transition along the strict graph
    /// `processing → shipped → delivered` (cancel only from processing).
    pub async fn update_order_status(
        &self,
        user: &CurrentUser,
        order_id: &str,
        new_status: OrderStatus,
    ) -> AppResult<Order> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {order_id} not found")))?;

        let is_line_seller = order.lines.iter().any(|l| l.seller == user.id);
        if !user.is_admin() && !(user.is_seller() && is_line_seller) {
            return Err(AppError::forbidden(
                "only the seller of this order or an admin may update its status",
            ));
        }

        order
            .order_status
            .transition_to(new_status)
            .map_err(|e| AppError::conflict(e.to_string()))?;

        if new_status == OrderStatus::Canceled {
            // Seller-driven cancel shares the stock-restore transaction
            return match self.orders.cancel_and_restore(order_id).await? {
                Some(updated) => {
                    self.notifier.order_canceled(&updated).await;
                    Ok(updated)
                }
                None => Err(AppError::conflict("order is no longer cancelable")),
            };
        }

        match self
            .orders
            .update_status(order_id, order.order_status, new_status)
            .await?
        {
            Some(updated) => Ok(updated),
            None => Err(AppError::conflict("order status changed concurrently")),
        }
    }

    /// Admin-only hard delete
    pub async fn delete_order(&self, user: &CurrentUser, order_id: &str) -> AppResult<()> {
        if !user.is_admin() {
            return Err(AppError::forbidden("only admins may delete orders"));
        }
        self.orders.delete(order_id).await?;
        tracing::info!(order_id = %order_id, "order deleted");
        Ok(())
    }

    // ── Webhook reconciliation ──────────────────────────────────────

    /// Record a completed refund. Unknown tx_ref is a no-op (the event
    /// is acknowledged either way).
    pub async fn record_refund(
        &self,
        tx_ref: &str,
        payload: serde_json::Value,
    ) -> AppResult<Option<Order>> {
        match self.orders.record_refund(tx_ref, payload).await? {
            Some(updated) => {
                tracing::info!(tx_ref = %tx_ref, "refund recorded");
                self.notifier.refund_completed(&updated).await;
                Ok(Some(updated))
            }
            None => {
                tracing::warn!(tx_ref = %tx_ref, "refund webhook for unknown tx_ref, ignored");
                Ok(None)
            }
        }
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Orders visible to the caller: own orders, or all orders for admins.
    pub async fn list_orders(&self, user: &CurrentUser, limit: i64, offset: i64) -> AppResult<Vec<Order>> {
        if user.is_admin() {
            Ok(self.orders.find_all(limit, offset).await?)
        } else {
            Ok(self.orders.find_by_user(&user.id).await?)
        }
    }

    /// Single order, visible to its owner, a seller on its lines, or admins.
    pub async fn get_order(&self, user: &CurrentUser, order_id: &str) -> AppResult<Order> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {order_id} not found")))?;

        let is_line_seller = order.lines.iter().any(|l| l.seller == user.id);
        if order.user != user.id && !user.is_admin() && !is_line_seller {
            return Err(AppError::forbidden("no access to this order"));
        }
        Ok(order)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Collision-resistant gateway reference. The user key keeps the
/// reference greppable; uniqueness comes from the UUID.
fn generate_tx_ref(user_id: &str) -> String {
    let user_key = user_id.replace(':', "-");
    format!("order-{}-{}", user_key, Uuid::new_v4().simple())
}

/// Set equality between an order's lines and a `{book id → quantity}`
/// selection: same books, same quantities, nothing more or less.
fn same_selection(order: &Order, selection: &HashMap<String, i64>) -> bool {
    if order.lines.len() != selection.len() {
        return false;
    }
    order.lines.iter().all(|line| {
        selection
            .get(&line.book.to_string())
            .is_some_and(|qty| *qty == line.quantity)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::RefundStatus;

    fn order_with_lines(lines: Vec<(&str, i64)>) -> Order {
        Order {
            id: None,
            user: "u_1".into(),
            lines: lines
                .into_iter()
                .map(|(book, quantity)| OrderLine {
                    book: book.parse().unwrap(),
                    title: "t".into(),
                    seller: "s_1".into(),
                    quantity,
                    unit_price: Decimal::new(500, 2),
                })
                .collect(),
            total_price: Decimal::ZERO,
            shipping_address: "addr".into(),
            tx_ref: "order-u_1-x".into(),
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Processing,
            refund_status: RefundStatus::None,
            transaction_details: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn selection(entries: &[(&str, i64)]) -> HashMap<String, i64> {
        entries
            .iter()
            .map(|(id, qty)| (id.to_string(), *qty))
            .collect()
    }

    #[test]
    fn test_same_selection_matches_identical_sets() {
        let order = order_with_lines(vec![("book:a", 2), ("book:b", 1)]);
        assert!(same_selection(
            &order,
            &selection(&[("book:b", 1), ("book:a", 2)])
        ));
    }

    #[test]
    fn test_same_selection_rejects_quantity_mismatch() {
        let order = order_with_lines(vec![("book:a", 2)]);
        assert!(!same_selection(&order, &selection(&[("book:a", 3)])));
    }

    #[test]
    fn test_same_selection_rejects_different_sets() {
        let order = order_with_lines(vec![("book:a", 2), ("book:b", 1)]);
        assert!(!same_selection(&order, &selection(&[("book:a", 2)])));
        assert!(!same_selection(
            &order,
            &selection(&[("book:a", 2), ("book:c", 1)])
        ));
    }

    #[test]
    fn test_line_totals_sum_exactly() {
        let order = order_with_lines(vec![("book:a", 2), ("book:b", 3)]);
        let total: Decimal = order.lines.iter().map(|l| l.line_total()).sum();
        // 2 × 5.00 + 3 × 5.00
        assert_eq!(total, Decimal::new(2500, 2));
    }

    #[test]
    fn test_tx_ref_shape_and_uniqueness() {
        let a = generate_tx_ref("user:42");
        let b = generate_tx_ref("user:42");
        assert!(a.starts_with("order-user-42-"));
        assert_ne!(a, b);
    }
}
