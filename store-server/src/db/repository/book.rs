//! Book Repository

use rust_decimal::Decimal;
use shared::BookCategory;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{Book, BookCreate, BookUpdate};
use crate::utils::time::now_millis;

const BOOK_TABLE: &str = "book";

// =============================================================================
// Book Repository
// =============================================================================

#[derive(Clone)]
pub struct BookRepository {
    base: BaseRepository,
}

impl BookRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all active books, optionally filtered by category
    pub async fn find_all(&self, category: Option<BookCategory>) -> RepoResult<Vec<Book>> {
        let books: Vec<Book> = match category {
            Some(cat) => {
                self.base
                    .db()
                    .query("SELECT * FROM book WHERE is_active = true AND category = $cat ORDER BY title")
                    .bind(("cat", cat))
                    .await?
                    .take(0)?
            }
            None => {
                self.base
                    .db()
                    .query("SELECT * FROM book WHERE is_active = true ORDER BY title")
                    .await?
                    .take(0)?
            }
        };
        Ok(books)
    }

    /// Find book by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Book>> {
        let record = parse_record_id(BOOK_TABLE, id)?;
        let book: Option<Book> = self.base.db().select(record).await?;
        Ok(book)
    }

    /// Find books by id list (active or not; callers check `is_active`)
    pub async fn find_many(&self, ids: &[RecordId]) -> RepoResult<Vec<Book>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let books: Vec<Book> = self
            .base
            .db()
            .query("SELECT * FROM book WHERE id IN $ids")
            .bind(("ids", ids.to_vec()))
            .await?
            .take(0)?;
        Ok(books)
    }

    /// Create a new book for a seller
    pub async fn create(&self, seller: &str, data: BookCreate) -> RepoResult<Book> {
        if data.price <= Decimal::ZERO {
            return Err(RepoError::Validation("price must be positive".into()));
        }
        if let Some(stock) = data.format.stock()
            && stock < 0
        {
            return Err(RepoError::Validation("stock must not be negative".into()));
        }

        let now = now_millis();
        let book = Book {
            id: None,
            title: data.title,
            author: data.author,
            price: data.price,
            category: data.category,
            format: data.format,
            seller: seller.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let created: Option<Book> = self.base.db().create(BOOK_TABLE).content(book).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create book".to_string()))
    }

    /// Update a book
    pub async fn update(&self, id: &str, data: BookUpdate) -> RepoResult<Book> {
        let record = parse_record_id(BOOK_TABLE, id)?;

        if let Some(price) = data.price
            && price <= Decimal::ZERO
        {
            return Err(RepoError::Validation("price must be positive".into()));
        }

        // Build dynamic SET clauses with proper type bindings
        let mut set_parts: Vec<&str> = vec!["updated_at = $updated_at"];

        if data.title.is_some() {
            set_parts.push("title = $title");
        }
        if data.author.is_some() {
            set_parts.push("author = $author");
        }
        if data.price.is_some() {
            set_parts.push("price = $price");
        }
        if data.category.is_some() {
            set_parts.push("category = $category");
        }
        if data.format.is_some() {
            set_parts.push("format = $format");
        }
        if data.is_active.is_some() {
            set_parts.push("is_active = $is_active");
        }

        let query_str = format!("UPDATE $record SET {} RETURN AFTER", set_parts.join(", "));

        let mut query = self
            .base
            .db()
            .query(&query_str)
            .bind(("record", record))
            .bind(("updated_at", now_millis()));

        if let Some(v) = data.title {
            query = query.bind(("title", v));
        }
        if let Some(v) = data.author {
            query = query.bind(("author", v));
        }
        if let Some(v) = data.price {
            query = query.bind(("price", v));
        }
        if let Some(v) = data.category {
            query = query.bind(("category", v));
        }
        if let Some(v) = data.format {
            query = query.bind(("format", v));
        }
        if let Some(v) = data.is_active {
            query = query.bind(("is_active", v));
        }

        let books: Vec<Book> = query.await?.take(0)?;
        books
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Book {} not found", id)))
    }

    /// Add stock to a physical book (seller restock)
    pub async fn restock(&self, id: &str, quantity: i64) -> RepoResult<Book> {
        if quantity <= 0 {
            return Err(RepoError::Validation("restock quantity must be positive".into()));
        }
        let record = parse_record_id(BOOK_TABLE, id)?;

        let books: Vec<Book> = self
            .base
            .db()
            .query(
                "UPDATE $record SET format.stock += $qty, updated_at = $now \
                 WHERE format.kind = 'physical' RETURN AFTER",
            )
            .bind(("record", record))
            .bind(("qty", quantity))
            .bind(("now", now_millis()))
            .await?
            .take(0)?;

        books.into_iter().next().ok_or_else(|| {
            RepoError::Validation(format!("Book {} not found or not a physical book", id))
        })
    }

    /// Soft-deactivate a book (orders may still reference it)
    pub async fn deactivate(&self, id: &str) -> RepoResult<Book> {
        self.update(
            id,
            BookUpdate {
                title: None,
                author: None,
                price: None,
                category: None,
                format: None,
                is_active: Some(false),
            },
        )
        .await
    }
}
