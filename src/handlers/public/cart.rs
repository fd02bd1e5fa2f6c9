use axum::{extract::State, http::StatusCode};
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::models::{AddCartItem, CartItem};

#[derive(Debug, Serialize)]
pub struct AddCartItemResponse {
    /// False when the animation was already in the cart.
    pub added: bool,
}

fn require_animation_id(animation_id: &str) -> Result<&str> {
    let trimmed = animation_id.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("animationId is required".into()));
    }
    Ok(trimmed)
}

pub async fn list_cart(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<CartItem>>> {
    let conn = state.db.get()?;
    let items = queries::list_cart_items(&conn, &user_id)?;
    Ok(Json(items))
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(input): Json<AddCartItem>,
) -> Result<(StatusCode, Json<AddCartItemResponse>)> {
    let animation_id = require_animation_id(&input.animation_id)?;
    let conn = state.db.get()?;
    let added = queries::add_cart_item(&conn, &user_id, animation_id)?;

    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(AddCartItemResponse { added })))
}

#[derive(Debug, Serialize)]
pub struct ClearCartResponse {
    pub removed: usize,
}

/// Empty the cart, e.g. once its contents have been checked out.
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ClearCartResponse>> {
    let conn = state.db.get()?;
    let removed = queries::clear_cart_items(&conn, &user_id)?;
    Ok(Json(ClearCartResponse { removed }))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    Path((user_id, animation_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let conn = state.db.get()?;
    if !queries::remove_cart_item(&conn, &user_id, &animation_id)? {
        return Err(AppError::NotFound("Item not in cart".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}
