//! Cart API Handlers
//!
//! 所有接口只操作调用者自己的购物车。

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::CartView;
use crate::db::repository::CartRepository;
use crate::utils::AppResult;
use crate::utils::validation::validate_quantity;

/// Get the caller's cart with current prices
pub async fn get_cart(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<CartView>> {
    let repo = CartRepository::new(state.db.clone());
    let cart = repo.load_priced(&user.id).await?;
    Ok(Json(cart))
}

/// Add item request
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub book_id: String,
    pub quantity: i64,
}

/// Add a book to the cart (lazy cart creation, quantity merge)
pub async fn add_item(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<AddItemRequest>,
) -> AppResult<Json<CartView>> {
    validate_quantity(payload.quantity)?;

    let repo = CartRepository::new(state.db.clone());
    let cart = repo
        .add_item(&user.id, &payload.book_id, payload.quantity)
        .await?;
    Ok(Json(cart))
}

/// Update quantity request
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

/// Replace the quantity of a cart line
pub async fn update_item(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(book_id): Path<String>,
    Json(payload): Json<UpdateItemRequest>,
) -> AppResult<Json<CartView>> {
    validate_quantity(payload.quantity)?;

    let repo = CartRepository::new(state.db.clone());
    let cart = repo
        .update_item(&user.id, &book_id, payload.quantity)
        .await?;
    Ok(Json(cart))
}

/// Remove a line from the cart
pub async fn remove_item(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(book_id): Path<String>,
) -> AppResult<Json<CartView>> {
    let repo = CartRepository::new(state.db.clone());
    let cart = repo.remove_item(&user.id, &book_id).await?;
    Ok(Json(cart))
}
