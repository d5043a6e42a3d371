//! Webhook API 模块
//!
//! 网关异步事件入口。认证走 HMAC 签名而不是 JWT。

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/webhook/chapa", post(handler::chapa_event))
}
