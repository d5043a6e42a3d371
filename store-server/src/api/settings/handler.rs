//! Settings API Handlers
//!
//! 维护模式开关。设置按请求从数据库读取，没有进程内全局态。

use axum::{Json, extract::State};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::Settings;
use crate::db::repository::SettingsRepository;
use crate::utils::{AppError, AppResult};

/// Read maintenance settings (admin)
pub async fn get_maintenance(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Settings>> {
    if !user.is_admin() {
        return Err(AppError::forbidden("admin only"));
    }
    let repo = SettingsRepository::new(state.db.clone());
    let settings = repo.load().await?;
    Ok(Json(settings))
}

/// Maintenance update request
#[derive(Debug, Deserialize)]
pub struct SetMaintenanceRequest {
    pub enabled: bool,
    pub message: Option<String>,
}

/// Toggle maintenance mode (admin)
pub async fn set_maintenance(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<SetMaintenanceRequest>,
) -> AppResult<Json<Settings>> {
    if !user.is_admin() {
        return Err(AppError::forbidden("admin only"));
    }
    let repo = SettingsRepository::new(state.db.clone());
    let settings = repo
        .set_maintenance(payload.enabled, payload.message)
        .await?;
    tracing::info!(enabled = payload.enabled, "maintenance mode updated");
    Ok(Json(settings))
}
