//! Order API Handlers
//!
//! 所有变更委托给 [`OrderService`](crate::orders::OrderService)。

use axum::{
    Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use shared::OrderStatus;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::orders::CheckoutResponse;
use crate::db::models::OrderView;
use crate::utils::AppResult;

/// Create order payload
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub shipping_address: String,
    pub book_ids: Vec<String>,
}

/// Checkout: create a pending order and return the hosted checkout URL
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<CheckoutResponse>> {
    let response = state
        .orders
        .create_order(&user, &payload.book_ids, &payload.shipping_address)
        .await?;
    Ok(Json(response))
}

/// Query params for listing orders
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// List orders (own orders; admins see all)
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<OrderView>>> {
    let orders = state
        .orders
        .list_orders(&user, query.limit, query.offset)
        .await?;
    Ok(Json(orders.into_iter().map(OrderView::from).collect()))
}

/// Get order by id (owner, line seller, or admin)
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<OrderView>> {
    let order = state.orders.get_order(&user, &id).await?;
    Ok(Json(order.into()))
}

/// Gateway callback query
#[derive(Debug, Deserialize)]
pub struct TxRefQuery {
    pub tx_ref: String,
}

/// Gateway redirect target: reconcile, then send the client to the
/// success page. tx_ref 必须原样透传。
pub async fn payment_callback(
    State(state): State<ServerState>,
    Query(query): Query<TxRefQuery>,
) -> AppResult<Redirect> {
    state.orders.verify_payment(&query.tx_ref).await?;
    Ok(Redirect::to(&format!(
        "/api/orders/payment-success?tx_ref={}",
        query.tx_ref
    )))
}

/// Payment confirmation payload
#[derive(Debug, serde::Serialize)]
pub struct PaymentSuccessResponse {
    pub order: OrderView,
    pub transaction_details: Option<serde_json::Value>,
}

/// Confirmation page data: stored transaction details, or a fresh
/// verify when the callback has not landed yet
pub async fn payment_success(
    State(state): State<ServerState>,
    Query(query): Query<TxRefQuery>,
) -> AppResult<Json<PaymentSuccessResponse>> {
    let order = state.orders.payment_success(&query.tx_ref).await?;
    let transaction_details = order.transaction_details.clone();
    Ok(Json(PaymentSuccessResponse {
        order: order.into(),
        transaction_details,
    }))
}

/// Status update request
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// Seller/admin fulfillment transition
pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<OrderView>> {
    let order = state
        .orders
        .update_order_status(&user, &id, payload.status)
        .await?;
    Ok(Json(order.into()))
}

/// Owner-only cancel (processing orders only)
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<OrderView>> {
    let order = state.orders.cancel_order(&user, &id).await?;
    Ok(Json(order.into()))
}

/// Admin-only hard delete
pub async fn delete_order(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<()>> {
    state.orders.delete_order(&user, &id).await?;
    Ok(Json(()))
}
