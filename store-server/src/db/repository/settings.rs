//! Settings Repository
//!
//! 固定 id 的单条文档 (`settings:store`)，按请求读取。

use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

use super::{BaseRepository, RepoResult};
use crate::db::models::Settings;
use crate::utils::time::now_millis;

const SETTINGS_TABLE: &str = "settings";
const SETTINGS_KEY: &str = "store";

#[derive(Clone)]
pub struct SettingsRepository {
    base: BaseRepository,
}

impl SettingsRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    fn record() -> RecordId {
        RecordId::from_table_key(SETTINGS_TABLE, SETTINGS_KEY)
    }

    /// Load the settings document; absent reads as defaults.
    pub async fn load(&self) -> RepoResult<Settings> {
        let settings: Option<Settings> = self.base.db().select(Self::record()).await?;
        Ok(settings.unwrap_or_default())
    }

    /// Set maintenance mode (admin)
    pub async fn set_maintenance(
        &self,
        enabled: bool,
        message: Option<String>,
    ) -> RepoResult<Settings> {
        let updated: Vec<Settings> = self
            .base
            .db()
            .query(
                "UPSERT $record SET maintenance_mode = $enabled, \
                 maintenance_message = $message, updated_at = $now RETURN AFTER",
            )
            .bind(("record", Self::record()))
            .bind(("enabled", enabled))
            .bind(("message", message))
            .bind(("now", now_millis()))
            .await?
            .take(0)?;

        updated
            .into_iter()
            .next()
            .ok_or_else(|| super::RepoError::Database("Failed to update settings".to_string()))
    }
}
