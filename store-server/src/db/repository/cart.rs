//! Cart Repository
//!
//! 每个用户一个购物车 (unique index)。所有变更走同一条路径：
//! 取出 → 改行项目 → 重新计价 → 持久化。重新计价时发现图书
//! 已下架或被删除的行会被剪除。

use std::collections::HashMap;

use rust_decimal::Decimal;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{Book, Cart, CartLine, CartLineView, CartView};
use crate::utils::time::now_millis;

const CART_TABLE: &str = "cart";
const BOOK_TABLE: &str = "book";

// =============================================================================
// Cart Repository
// =============================================================================

#[derive(Clone)]
pub struct CartRepository {
    base: BaseRepository,
}

impl CartRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find a user's cart
    pub async fn find_by_user(&self, user: &str) -> RepoResult<Option<Cart>> {
        let carts: Vec<Cart> = self
            .base
            .db()
            .query("SELECT * FROM cart WHERE user = $user LIMIT 1")
            .bind(("user", user.to_string()))
            .await?
            .take(0)?;
        Ok(carts.into_iter().next())
    }

    /// Load a user's cart with current prices, pruning unpriceable lines.
    ///
    /// Missing cart reads as an empty one; carts are created lazily.
    pub async fn load_priced(&self, user: &str) -> RepoResult<CartView> {
        match self.find_by_user(user).await? {
            Some(cart) => self.reprice_and_save(cart).await,
            None => Ok(CartView::empty()),
        }
    }

    /// Add a book to the cart, merging quantity into an existing line.
    /// Creates the cart lazily on first add.
    pub async fn add_item(&self, user: &str, book_id: &str, quantity: i64) -> RepoResult<CartView> {
        let book = parse_record_id(BOOK_TABLE, book_id)?;

        let mut cart = match self.find_by_user(user).await? {
            Some(cart) => cart,
            None => self.create_empty(user).await?,
        };

        match cart.lines.iter_mut().find(|l| l.book == book) {
            Some(line) => line.quantity += quantity,
            None => cart.lines.push(CartLine {
                book,
                quantity,
            }),
        }

        self.reprice_and_save(cart).await
    }

    /// Replace the quantity of an existing line
    pub async fn update_item(
        &self,
        user: &str,
        book_id: &str,
        quantity: i64,
    ) -> RepoResult<CartView> {
        let book = parse_record_id(BOOK_TABLE, book_id)?;

        let mut cart = self
            .find_by_user(user)
            .await?
            .ok_or_else(|| RepoError::NotFound("Cart is empty".to_string()))?;

        let line = cart
            .lines
            .iter_mut()
            .find(|l| l.book == book)
            .ok_or_else(|| RepoError::NotFound(format!("Book {} is not in the cart", book_id)))?;
        line.quantity = quantity;

        self.reprice_and_save(cart).await
    }

    /// Remove a line from the cart
    pub async fn remove_item(&self, user: &str, book_id: &str) -> RepoResult<CartView> {
        let book = parse_record_id(BOOK_TABLE, book_id)?;

        let mut cart = self
            .find_by_user(user)
            .await?
            .ok_or_else(|| RepoError::NotFound("Cart is empty".to_string()))?;

        let before = cart.lines.len();
        cart.lines.retain(|l| l.book != book);
        if cart.lines.len() == before {
            return Err(RepoError::NotFound(format!(
                "Book {} is not in the cart",
                book_id
            )));
        }

        self.reprice_and_save(cart).await
    }

    /// Remove the purchased lines after checkout and recompute the total.
    /// The cart itself is kept.
    pub async fn remove_lines(&self, user: &str, books: &[RecordId]) -> RepoResult<CartView> {
        let Some(mut cart) = self.find_by_user(user).await? else {
            return Ok(CartView::empty());
        };

        cart.lines.retain(|l| !books.contains(&l.book));
        self.reprice_and_save(cart).await
    }

    // ── Internals ───────────────────────────────────────────────────

    async fn create_empty(&self, user: &str) -> RepoResult<Cart> {
        let cart = Cart {
            id: None,
            user: user.to_string(),
            lines: Vec::new(),
            total_price: Decimal::ZERO,
            updated_at: now_millis(),
        };
        let created: Option<Cart> = self.base.db().create(CART_TABLE).content(cart).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create cart".to_string()))
    }

    /// Join lines with their books, prune lines that can no longer be
    /// priced (book gone or deactivated), persist, and build the view.
    async fn reprice_and_save(&self, mut cart: Cart) -> RepoResult<CartView> {
        let ids: Vec<RecordId> = cart.lines.iter().map(|l| l.book.clone()).collect();

        let books: Vec<Book> = if ids.is_empty() {
            Vec::new()
        } else {
            self.base
                .db()
                .query("SELECT * FROM book WHERE id IN $ids")
                .bind(("ids", ids))
                .await?
                .take(0)?
        };

        let by_id: HashMap<String, Book> = books
            .into_iter()
            .filter_map(|b| b.id.clone().map(|id| (id.to_string(), b)))
            .collect();

        cart.lines.retain(|line| {
            by_id
                .get(&line.book.to_string())
                .map(|b| b.is_active)
                .unwrap_or(false)
        });

        let mut lines = Vec::with_capacity(cart.lines.len());
        let mut total = Decimal::ZERO;
        for line in &cart.lines {
            // retain above guarantees presence
            let Some(book) = by_id.get(&line.book.to_string()) else {
                continue;
            };
            let line_total = book.price * Decimal::from(line.quantity);
            total += line_total;
            lines.push(CartLineView {
                book: book.clone(),
                quantity: line.quantity,
                line_total,
            });
        }

        cart.total_price = total;
        cart.updated_at = now_millis();

        if let Some(id) = cart.id.clone() {
            let _: Vec<Cart> = self
                .base
                .db()
                .query(
                    "UPDATE $record SET lines = $lines, total_price = $total, \
                     updated_at = $now RETURN AFTER",
                )
                .bind(("record", id))
                .bind(("lines", cart.lines.clone()))
                .bind(("total", cart.total_price))
                .bind(("now", cart.updated_at))
                .await?
                .take(0)?;
        }

        Ok(CartView {
            lines,
            total_price: total,
        })
    }
}
