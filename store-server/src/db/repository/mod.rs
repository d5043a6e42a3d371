//! Repository Module
//!
//! Provides CRUD operations for SurrealDB tables.

// Catalog
pub mod book;

// Cart
pub mod cart;

// Orders
pub mod order;

// System
pub mod settings;

// Re-exports
pub use book::BookRepository;
pub use cart::CartRepository;
pub use order::OrderRepository;
pub use settings::SettingsRepository;

use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

// =============================================================================
// ID Convention: 全栈统一使用 "table:id" 格式
// =============================================================================
//
// 使用 surrealdb::RecordId 处理所有 ID：
//   - 解析: let id: RecordId = "book:abc".parse()?;
//   - 创建: let id = RecordId::from_table_key("book", "abc");
//   - CRUD: db.select(id) / db.delete(id) 直接使用 RecordId

/// Parse a client-supplied id ("table:key" or bare key) into a RecordId,
/// rejecting ids that point at a different table.
pub fn parse_record_id(table: &str, raw: &str) -> RepoResult<RecordId> {
    let id: RecordId = if raw.contains(':') {
        raw.parse()
            .map_err(|_| RepoError::Validation(format!("invalid id: {raw}")))?
    } else {
        RecordId::from_table_key(table, raw)
    };

    if id.table() != table {
        return Err(RepoError::Validation(format!(
            "expected a {table} id, got {raw}"
        )));
    }
    Ok(id)
}

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}
