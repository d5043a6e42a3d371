//! Book Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{BookCategory, BookFormat};
use surrealdb::RecordId;

use super::serde_helpers;

/// Book model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    pub title: String,
    pub author: String,
    /// Unit price, always > 0
    pub price: Decimal,
    pub category: BookCategory,
    /// Physical carries stock; digital/audio carry a file reference
    pub format: BookFormat,
    /// Owning seller (JWT subject)
    pub seller: String,
    /// Soft flag; books referenced by orders are deactivated, never deleted
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookCreate {
    pub title: String,
    pub author: String,
    pub price: Decimal,
    pub category: BookCategory,
    pub format: BookFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<BookCategory>,
    pub format: Option<BookFormat>,
    pub is_active: Option<bool>,
}
