//! Cart of the signed-in customer.
//!
//! Lines are validated against the catalog on every write with the same
//! rules checkout applies, so a cart never holds a line checkout would
//! refuse at the time it was added.

use axum::{
    Json,
    extract::{Path, State},
};

use stride_core::{CartItemId, UserId};

use crate::db::{CartRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::cart::{Cart, CartItemInput, CartItemUpdate};
use crate::services::checkout::{add_to_line, price_lines};
use crate::state::AppState;

async fn load(state: &AppState, user: UserId) -> Result<Cart> {
    let items = CartRepository::new(state.pool()).items(user).await?;
    Ok(Cart::new(items))
}

async fn check_line(state: &AppState, line: &CartItemInput) -> Result<()> {
    let product = ProductRepository::new(state.pool())
        .get_by_id(line.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
    price_lines(std::slice::from_ref(line), &[product])?;
    Ok(())
}

pub async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Cart>> {
    Ok(Json(load(&state, user.id).await?))
}

/// Add a line, merging with an identical product/size/colour line.
pub async fn add(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(mut input): Json<CartItemInput>,
) -> Result<Json<Cart>> {
    input.size = input.size.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    input.color = input.color.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());

    let existing = CartRepository::new(state.pool())
        .items(user.id)
        .await?
        .into_iter()
        .find(|item| {
            item.product_id == input.product_id
                && item.size == input.size
                && item.color == input.color
        })
        .map_or(0, |item| item.quantity);

    let combined = CartItemInput {
        quantity: add_to_line(existing, input.quantity)?,
        ..input.clone()
    };
    check_line(&state, &combined).await?;

    CartRepository::new(state.pool()).add(user.id, &input).await?;
    Ok(Json(load(&state, user.id).await?))
}

/// Change a line's quantity. Zero removes the line.
pub async fn update(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<CartItemId>,
    Json(update): Json<CartItemUpdate>,
) -> Result<Json<Cart>> {
    let repo = CartRepository::new(state.pool());
    if update.quantity <= 0 {
        repo.remove(user.id, id).await?;
        return Ok(Json(load(&state, user.id).await?));
    }

    let line = repo
        .items(user.id)
        .await?
        .into_iter()
        .find(|item| item.id == id)
        .ok_or_else(|| AppError::NotFound("Cart item".to_string()))?;
    check_line(
        &state,
        &CartItemInput {
            product_id: line.product_id,
            size: line.size,
            color: line.color,
            quantity: update.quantity,
        },
    )
    .await?;

    repo.set_quantity(user.id, id, update.quantity).await?;
    Ok(Json(load(&state, user.id).await?))
}

pub async fn remove(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<CartItemId>,
) -> Result<Json<Cart>> {
    CartRepository::new(state.pool()).remove(user.id, id).await?;
    Ok(Json(load(&state, user.id).await?))
}

pub async fn clear(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Cart>> {
    CartRepository::new(state.pool()).clear(user.id).await?;
    Ok(Json(Cart::new(Vec::new())))
}
