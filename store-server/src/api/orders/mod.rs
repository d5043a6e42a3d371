//! Order API Module
//!
//! 下单与查询需要认证；支付回调/成功页由网关跳转触发，按
//! tx_ref 对账，无需 JWT。

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", order_routes())
}

fn order_routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create).get(handler::list))
        // Gateway redirect targets (public, keyed by tx_ref)
        .route("/payment-callback", get(handler::payment_callback))
        .route("/payment-success", get(handler::payment_success))
        .route("/{id}", get(handler::get_by_id).delete(handler::delete_order))
        .route("/{id}/status", put(handler::update_status))
        .route("/{id}/cancel", put(handler::cancel))
}
