//! Order lifecycle integration tests
//!
//! 在内存引擎上走完整的下单 → 对账 → 取消流程，
//! 网关用可控的 mock 替身。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

use shared::{BookCategory, BookFormat, OrderStatus, PaymentStatus, RefundStatus};
use store_server::auth::{CurrentUser, JwtConfig, Role};
use store_server::core::{Config, ServerState};
use store_server::db::define_schema;
use store_server::db::models::{Book, BookCreate};
use store_server::db::repository::{BookRepository, CartRepository, SettingsRepository};
use store_server::notify::LogNotifier;
use store_server::payment::{
    ChargeStatus, ChargeVerification, GatewayError, InitializeCharge, PaymentGateway,
};
use store_server::utils::AppError;

// ── Test doubles ────────────────────────────────────────────────────

/// Gateway stub with controllable outcomes and call counters
struct MockGateway {
    init_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    fail_init: AtomicBool,
    verify_success: AtomicBool,
}

impl MockGateway {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            init_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            fail_init: AtomicBool::new(false),
            verify_success: AtomicBool::new(true),
        })
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn initialize_charge(&self, request: InitializeCharge) -> Result<String, GatewayError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("connection refused".into()));
        }
        Ok(format!("https://checkout.example/{}", request.tx_ref))
    }

    async fn verify_transaction(&self, tx_ref: &str) -> Result<ChargeVerification, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let success = self.verify_success.load(Ordering::SeqCst);
        Ok(ChargeVerification {
            status: if success {
                ChargeStatus::Success
            } else {
                ChargeStatus::Failed
            },
            raw: serde_json::json!({
                "status": if success { "success" } else { "failed" },
                "tx_ref": tx_ref,
            }),
        })
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

fn test_config() -> Config {
    Config {
        data_dir: "/tmp/bookstall-test".into(),
        http_port: 0,
        public_base_url: "http://localhost:3000".into(),
        jwt: JwtConfig {
            secret: "test-secret-key-at-least-32-bytes-long!".into(),
            issuer: "bookstall-auth".into(),
            audience: "bookstall-api".into(),
        },
        environment: "test".into(),
        currency: "ETB".into(),
        chapa_secret_key: "sk_test".into(),
        chapa_base_url: None,
        webhook_secret: "whsec_test".into(),
        gateway_timeout_ms: 1_000,
    }
}

async fn memory_db() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.expect("in-memory db");
    db.use_ns("bookstall").use_db("store").await.expect("ns/db");
    define_schema(&db).await.expect("schema");
    db
}

async fn test_state() -> (ServerState, Arc<MockGateway>) {
    let db = memory_db().await;
    let gateway = MockGateway::new();
    let state = ServerState::with_parts(
        test_config(),
        db,
        gateway.clone(),
        Arc::new(LogNotifier),
    );
    (state, gateway)
}

fn buyer() -> CurrentUser {
    CurrentUser {
        id: "u_buyer".into(),
        email: "buyer@example.com".into(),
        role: Role::Buyer,
    }
}

fn admin() -> CurrentUser {
    CurrentUser {
        id: "u_admin".into(),
        email: "admin@example.com".into(),
        role: Role::Admin,
    }
}

/// Seed a physical book and return it
async fn seed_book(state: &ServerState, title: &str, price: Decimal, stock: i64) -> Book {
    let repo = BookRepository::new(state.db.clone());
    repo.create(
        "u_seller",
        BookCreate {
            title: title.into(),
            author: "A. Writer".into(),
            price,
            category: BookCategory::Fiction,
            format: BookFormat::Physical { stock },
        },
    )
    .await
    .expect("seed book")
}

fn book_id(book: &Book) -> String {
    book.id.as_ref().expect("book id").to_string()
}

async fn add_to_cart(state: &ServerState, user: &CurrentUser, book: &Book, quantity: i64) {
    CartRepository::new(state.db.clone())
        .add_item(&user.id, &book_id(book), quantity)
        .await
        .expect("add to cart");
}

async fn stock_of(state: &ServerState, book: &Book) -> i64 {
    BookRepository::new(state.db.clone())
        .find_by_id(&book_id(book))
        .await
        .expect("find book")
        .expect("book exists")
        .format
        .stock()
        .expect("physical book")
}

// ── Checkout validation ─────────────────────────────────────────────

#[tokio::test]
async fn empty_selection_is_rejected_without_persisting() {
    let (state, _) = test_state().await;
    let user = buyer();

    let err = state
        .orders
        .create_order(&user, &[], "1 Main St")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let orders = state.orders.list_orders(&user, 50, 0).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn unknown_book_is_rejected_without_persisting() {
    let (state, _) = test_state().await;
    let user = buyer();
    let book = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    add_to_cart(&state, &user, &book, 1).await;

    let err = state
        .orders
        .create_order(&user, &["book:doesnotexist".into()], "1 Main St")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let orders = state.orders.list_orders(&user, 50, 0).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn selection_must_come_from_the_cart() {
    let (state, _) = test_state().await;
    let user = buyer();
    let book = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    // Nothing in the cart

    let err = state
        .orders
        .create_order(&user, &[book_id(&book)], "1 Main St")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn total_is_exact_sum_of_lines() {
    let (state, _) = test_state().await;
    let user = buyer();
    let a = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    let b = seed_book(&state, "Foundation", Decimal::new(1999, 2), 10).await;
    add_to_cart(&state, &user, &a, 2).await;
    add_to_cart(&state, &user, &b, 3).await;

    let checkout = state
        .orders
        .create_order(&user, &[book_id(&a), book_id(&b)], "1 Main St")
        .await
        .unwrap();

    // 2 × 5.00 + 3 × 19.99 = 69.97
    assert_eq!(checkout.order.total_price, Decimal::new(6997, 2));
    assert_eq!(checkout.order.payment_status, PaymentStatus::Pending);
    assert!(checkout.checkout_url.starts_with("https://checkout.example/"));
}

#[tokio::test]
async fn purchased_lines_leave_the_cart() {
    let (state, _) = test_state().await;
    let user = buyer();
    let a = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    let b = seed_book(&state, "Foundation", Decimal::new(1999, 2), 10).await;
    add_to_cart(&state, &user, &a, 1).await;
    add_to_cart(&state, &user, &b, 1).await;

    state
        .orders
        .create_order(&user, &[book_id(&a)], "1 Main St")
        .await
        .unwrap();

    let cart = CartRepository::new(state.db.clone())
        .load_priced(&user.id)
        .await
        .unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(book_id(&cart.lines[0].book), book_id(&b));
    assert_eq!(cart.total_price, Decimal::new(1999, 2));
}

#[tokio::test]
async fn duplicate_submission_is_rejected() {
    let (state, _) = test_state().await;
    let user = buyer();
    let book = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    add_to_cart(&state, &user, &book, 2).await;

    state
        .orders
        .create_order(&user, &[book_id(&book)], "1 Main St")
        .await
        .unwrap();

    // Same selection again while the first order is still pending
    add_to_cart(&state, &user, &book, 2).await;
    let err = state
        .orders
        .create_order(&user, &[book_id(&book)], "1 Main St")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Different quantity is a different order
    CartRepository::new(state.db.clone())
        .update_item(&user.id, &book_id(&book), 3)
        .await
        .unwrap();
    state
        .orders
        .create_order(&user, &[book_id(&book)], "1 Main St")
        .await
        .unwrap();
}

#[tokio::test]
async fn gateway_failure_leaves_pending_order_and_cart() {
    let (state, gateway) = test_state().await;
    let user = buyer();
    let book = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    add_to_cart(&state, &user, &book, 1).await;

    gateway.fail_init.store(true, Ordering::SeqCst);
    let err = state
        .orders
        .create_order(&user, &[book_id(&book)], "1 Main St")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Gateway(_)));

    // Pending order persisted for reconciliation, cart untouched
    let orders = state.orders.list_orders(&user, 50, 0).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].payment_status, PaymentStatus::Pending);

    let cart = CartRepository::new(state.db.clone())
        .load_priced(&user.id)
        .await
        .unwrap();
    assert_eq!(cart.lines.len(), 1);
}

#[tokio::test]
async fn maintenance_mode_refuses_checkout() {
    let (state, _) = test_state().await;
    let user = buyer();
    let book = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    add_to_cart(&state, &user, &book, 1).await;

    SettingsRepository::new(state.db.clone())
        .set_maintenance(true, Some("back soon".into()))
        .await
        .unwrap();

    let err = state
        .orders
        .create_order(&user, &[book_id(&book)], "1 Main St")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Maintenance));
}

// ── Payment reconciliation ──────────────────────────────────────────

#[tokio::test]
async fn verify_settles_payment_and_decrements_stock_once() {
    let (state, gateway) = test_state().await;
    let user = buyer();
    let book = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    add_to_cart(&state, &user, &book, 2).await;

    let checkout = state
        .orders
        .create_order(&user, &[book_id(&book)], "1 Main St")
        .await
        .unwrap();
    let tx_ref = checkout.order.tx_ref.clone();

    let settled = state.orders.verify_payment(&tx_ref).await.unwrap();
    assert_eq!(settled.payment_status, PaymentStatus::Paid);
    assert_eq!(settled.order_status, OrderStatus::Processing);
    assert!(settled.transaction_details.is_some());
    assert_eq!(stock_of(&state, &book).await, 8);

    // Second verify is a no-op: no second gateway call, no second decrement
    let again = state.orders.verify_payment(&tx_ref).await.unwrap();
    assert_eq!(again.payment_status, PaymentStatus::Paid);
    assert_eq!(stock_of(&state, &book).await, 8);
    assert_eq!(gateway.verify_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_verifies_decrement_stock_once() {
    let (state, gateway) = test_state().await;
    let user = buyer();
    let book = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    add_to_cart(&state, &user, &book, 2).await;

    let checkout = state
        .orders
        .create_order(&user, &[book_id(&book)], "1 Main St")
        .await
        .unwrap();
    let tx_ref = checkout.order.tx_ref.clone();

    let s1 = state.clone();
    let s2 = state.clone();
    let t1 = tx_ref.clone();
    let t2 = tx_ref.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { s1.orders.verify_payment(&t1).await }),
        tokio::spawn(async move { s2.orders.verify_payment(&t2).await }),
    );
    let a = a.unwrap().unwrap();
    let b = b.unwrap().unwrap();

    assert_eq!(a.payment_status, PaymentStatus::Paid);
    assert_eq!(b.payment_status, PaymentStatus::Paid);
    assert_eq!(stock_of(&state, &book).await, 8);
    assert_eq!(gateway.verify_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_verification_keeps_stock() {
    let (state, gateway) = test_state().await;
    let user = buyer();
    let book = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    add_to_cart(&state, &user, &book, 2).await;

    let checkout = state
        .orders
        .create_order(&user, &[book_id(&book)], "1 Main St")
        .await
        .unwrap();

    gateway.verify_success.store(false, Ordering::SeqCst);
    let settled = state
        .orders
        .verify_payment(&checkout.order.tx_ref)
        .await
        .unwrap();
    assert_eq!(settled.payment_status, PaymentStatus::Failed);
    assert_eq!(stock_of(&state, &book).await, 10);
}

#[tokio::test]
async fn verify_unknown_tx_ref_is_not_found() {
    let (state, _) = test_state().await;
    let err = state
        .orders
        .verify_payment("order-u_buyer-missing")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ── Cancellation & fulfillment ──────────────────────────────────────

#[tokio::test]
async fn full_walkthrough_order_pay_cancel_restores_stock() {
    let (state, _) = test_state().await;
    let user = buyer();
    let book = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    add_to_cart(&state, &user, &book, 2).await;

    // Order 2 × 5.00 → total 10.00, pending
    let checkout = state
        .orders
        .create_order(&user, &[book_id(&book)], "1 Main St")
        .await
        .unwrap();
    assert_eq!(checkout.order.total_price, Decimal::new(1000, 2));
    assert_eq!(checkout.order.payment_status, PaymentStatus::Pending);

    // Gateway verifies success → paid, stock 8
    let paid = state
        .orders
        .verify_payment(&checkout.order.tx_ref)
        .await
        .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(stock_of(&state, &book).await, 8);

    // Cancel while processing → stock 10, canceled
    let canceled = state
        .orders
        .cancel_order(&user, &checkout.order.id)
        .await
        .unwrap();
    assert_eq!(canceled.order_status, OrderStatus::Canceled);
    assert_eq!(stock_of(&state, &book).await, 10);

    // Cancel again → rejected
    let err = state
        .orders
        .cancel_order(&user, &checkout.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn cancel_is_owner_only() {
    let (state, _) = test_state().await;
    let user = buyer();
    let book = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    add_to_cart(&state, &user, &book, 1).await;

    let checkout = state
        .orders
        .create_order(&user, &[book_id(&book)], "1 Main St")
        .await
        .unwrap();

    let stranger = CurrentUser {
        id: "u_other".into(),
        email: "other@example.com".into(),
        role: Role::Buyer,
    };
    let err = state
        .orders
        .cancel_order(&stranger, &checkout.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn unpaid_cancel_does_not_inflate_stock() {
    let (state, _) = test_state().await;
    let user = buyer();
    let book = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    add_to_cart(&state, &user, &book, 2).await;

    let checkout = state
        .orders
        .create_order(&user, &[book_id(&book)], "1 Main St")
        .await
        .unwrap();

    // Never paid: stock was never decremented, cancel must not add to it
    let canceled = state
        .orders
        .cancel_order(&user, &checkout.order.id)
        .await
        .unwrap();
    assert_eq!(canceled.order_status, OrderStatus::Canceled);
    assert_eq!(stock_of(&state, &book).await, 10);
}

#[tokio::test]
async fn fulfillment_follows_the_strict_graph() {
    let (state, _) = test_state().await;
    let user = buyer();
    let admin = admin();
    let book = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    add_to_cart(&state, &user, &book, 1).await;

    let checkout = state
        .orders
        .create_order(&user, &[book_id(&book)], "1 Main St")
        .await
        .unwrap();
    state
        .orders
        .verify_payment(&checkout.order.tx_ref)
        .await
        .unwrap();

    // Skipping shipped is rejected
    let err = state
        .orders
        .update_order_status(&admin, &checkout.order.id, OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // processing → shipped → delivered
    let shipped = state
        .orders
        .update_order_status(&admin, &checkout.order.id, OrderStatus::Shipped)
        .await
        .unwrap();
    assert_eq!(shipped.order_status, OrderStatus::Shipped);

    // Cancel after shipping is rejected
    let err = state
        .orders
        .cancel_order(&user, &checkout.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let delivered = state
        .orders
        .update_order_status(&admin, &checkout.order.id, OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(delivered.order_status, OrderStatus::Delivered);

    // Delivered is terminal
    let err = state
        .orders
        .update_order_status(&admin, &checkout.order.id, OrderStatus::Shipped)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn status_update_requires_seller_or_admin() {
    let (state, _) = test_state().await;
    let user = buyer();
    let book = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    add_to_cart(&state, &user, &book, 1).await;

    let checkout = state
        .orders
        .create_order(&user, &[book_id(&book)], "1 Main St")
        .await
        .unwrap();

    let err = state
        .orders
        .update_order_status(&user, &checkout.order.id, OrderStatus::Shipped)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // The seller on the order lines may transition it
    let seller = CurrentUser {
        id: "u_seller".into(),
        email: "seller@example.com".into(),
        role: Role::Seller,
    };
    state
        .orders
        .verify_payment(&checkout.order.tx_ref)
        .await
        .unwrap();
    let shipped = state
        .orders
        .update_order_status(&seller, &checkout.order.id, OrderStatus::Shipped)
        .await
        .unwrap();
    assert_eq!(shipped.order_status, OrderStatus::Shipped);
}

#[tokio::test]
async fn delete_is_admin_only() {
    let (state, _) = test_state().await;
    let user = buyer();
    let book = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    add_to_cart(&state, &user, &book, 1).await;

    let checkout = state
        .orders
        .create_order(&user, &[book_id(&book)], "1 Main St")
        .await
        .unwrap();

    let err = state
        .orders
        .delete_order(&user, &checkout.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    state
        .orders
        .delete_order(&admin(), &checkout.order.id)
        .await
        .unwrap();
    let err = state
        .orders
        .get_order(&admin(), &checkout.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ── Refund webhook reconciliation ───────────────────────────────────

#[tokio::test]
async fn refund_event_marks_the_matching_order() {
    let (state, _) = test_state().await;
    let user = buyer();
    let book = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    add_to_cart(&state, &user, &book, 1).await;

    let checkout = state
        .orders
        .create_order(&user, &[book_id(&book)], "1 Main St")
        .await
        .unwrap();
    state
        .orders
        .verify_payment(&checkout.order.tx_ref)
        .await
        .unwrap();

    let payload = serde_json::json!({
        "event": "charge.refunded",
        "tx_ref": checkout.order.tx_ref,
    });
    let refunded = state
        .orders
        .record_refund(&checkout.order.tx_ref, payload)
        .await
        .unwrap()
        .expect("order matched");
    assert_eq!(refunded.refund_status, RefundStatus::Completed);
}

#[tokio::test]
async fn refund_for_unknown_tx_ref_is_a_noop() {
    let (state, _) = test_state().await;
    let result = state
        .orders
        .record_refund("order-u_x-unknown", serde_json::json!({}))
        .await
        .unwrap();
    assert!(result.is_none());
}

// ── Storage ─────────────────────────────────────────────────────────

#[tokio::test]
async fn on_disk_database_initializes_with_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let service = store_server::db::DbService::new(&path.to_string_lossy())
        .await
        .unwrap();

    let repo = BookRepository::new(service.db.clone());
    let book = repo
        .create(
            "u_seller",
            BookCreate {
                title: "Dune".into(),
                author: "A. Writer".into(),
                price: Decimal::new(500, 2),
                category: BookCategory::Fiction,
                format: BookFormat::Physical { stock: 1 },
            },
        )
        .await
        .unwrap();
    assert!(book.id.is_some());
}

// ── Cart pruning ────────────────────────────────────────────────────

#[tokio::test]
async fn deactivated_books_are_pruned_from_the_cart() {
    let (state, _) = test_state().await;
    let user = buyer();
    let a = seed_book(&state, "Dune", Decimal::new(500, 2), 10).await;
    let b = seed_book(&state, "Foundation", Decimal::new(1999, 2), 10).await;
    add_to_cart(&state, &user, &a, 1).await;
    add_to_cart(&state, &user, &b, 1).await;

    BookRepository::new(state.db.clone())
        .deactivate(&book_id(&a))
        .await
        .unwrap();

    let cart = CartRepository::new(state.db.clone())
        .load_priced(&user.id)
        .await
        .unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.total_price, Decimal::new(1999, 2));
}
