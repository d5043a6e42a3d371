//! Book API Handlers
//!
//! 创建和修改仅限卖家本人 (或管理员)；删除是软下架，
//! 已有订单仍然引用快照数据。

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::BookCategory;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{Book, BookCreate, BookUpdate};
use crate::db::repository::BookRepository;
use crate::utils::validation::{
    MAX_FILE_REF_LEN, MAX_NAME_LEN, validate_quantity, validate_required_text,
};
use crate::utils::{AppError, AppResult};

/// Query params for listing books
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<BookCategory>,
}

/// List all active books (public)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let repo = BookRepository::new(state.db.clone());
    let books = repo.find_all(query.category).await?;
    Ok(Json(books))
}

/// Get book by id (public)
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Book>> {
    let repo = BookRepository::new(state.db.clone());
    let book = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Book {} not found", id)))?;
    Ok(Json(book))
}

/// Create a new book (seller)
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<BookCreate>,
) -> AppResult<Json<Book>> {
    if !user.is_seller() {
        return Err(AppError::forbidden("only sellers may list books"));
    }
    validate_required_text(&payload.title, "title", MAX_NAME_LEN)?;
    validate_required_text(&payload.author, "author", MAX_NAME_LEN)?;
    if let shared::BookFormat::Digital { file_ref } | shared::BookFormat::Audiobook { file_ref } =
        &payload.format
    {
        validate_required_text(file_ref, "file_ref", MAX_FILE_REF_LEN)?;
    }

    let repo = BookRepository::new(state.db.clone());
    let book = repo.create(&user.id, payload).await?;
    Ok(Json(book))
}

/// Update a book (owning seller or admin)
pub async fn update(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<BookUpdate>,
) -> AppResult<Json<Book>> {
    let repo = BookRepository::new(state.db.clone());
    check_ownership(&repo, &user, &id).await?;

    if let Some(title) = &payload.title {
        validate_required_text(title, "title", MAX_NAME_LEN)?;
    }
    if let Some(author) = &payload.author {
        validate_required_text(author, "author", MAX_NAME_LEN)?;
    }

    let book = repo.update(&id, payload).await?;
    Ok(Json(book))
}

/// Restock request
#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub quantity: i64,
}

/// Add stock to a physical book (owning seller or admin)
pub async fn restock(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<RestockRequest>,
) -> AppResult<Json<Book>> {
    let repo = BookRepository::new(state.db.clone());
    check_ownership(&repo, &user, &id).await?;
    validate_quantity(payload.quantity)?;

    let book = repo.restock(&id, payload.quantity).await?;
    Ok(Json(book))
}

/// Soft-deactivate a book (owning seller or admin); orders keep their
/// snapshot, so the record itself is never hard-deleted.
pub async fn deactivate(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Book>> {
    let repo = BookRepository::new(state.db.clone());
    check_ownership(&repo, &user, &id).await?;

    let book = repo.deactivate(&id).await?;
    Ok(Json(book))
}

async fn check_ownership(
    repo: &BookRepository,
    user: &CurrentUser,
    id: &str,
) -> AppResult<()> {
    let book = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Book {} not found", id)))?;
    if book.seller != user.id && !user.is_admin() {
        return Err(AppError::forbidden("not the seller of this book"));
    }
    Ok(())
}
