//! Database Module
//!
//! Embedded SurrealDB (RocksDB on disk, in-memory engine for tests).

pub mod models;
pub mod repository;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, RocksDb};

use crate::utils::AppError;

const NAMESPACE: &str = "bookstall";
const DATABASE: &str = "store";

/// Database service, owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open (or create) the on-disk database and define the schema
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let db = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        define_schema(&db).await?;

        tracing::info!("Database ready (SurrealDB embedded, path={db_path})");

        Ok(Self { db })
    }
}

/// Idempotent schema definition, run at every startup.
///
/// 两个唯一索引承载不变量：每个用户一个购物车，tx_ref 全局唯一。
pub async fn define_schema(db: &Surreal<Db>) -> Result<(), AppError> {
    db.query(
        "DEFINE TABLE IF NOT EXISTS book SCHEMALESS;
         DEFINE TABLE IF NOT EXISTS cart SCHEMALESS;
         DEFINE INDEX IF NOT EXISTS cart_user ON TABLE cart FIELDS user UNIQUE;
         DEFINE TABLE IF NOT EXISTS orders SCHEMALESS;
         DEFINE INDEX IF NOT EXISTS orders_tx_ref ON TABLE orders FIELDS tx_ref UNIQUE;
         DEFINE TABLE IF NOT EXISTS settings SCHEMALESS;",
    )
    .await
    .map_err(|e| AppError::database(format!("Failed to define schema: {e}")))?;
    Ok(())
}
