//! Settings API 模块

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route(
        "/api/settings/maintenance",
        get(handler::get_maintenance).put(handler::set_maintenance),
    )
}
