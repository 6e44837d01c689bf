//! Shop merchandise.

use super::{created, done, respond};
use crate::error::AppError;
use crate::extractors::{ApiJson, RequireAdmin};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use club_portal_core::api::ProductDraft;
use club_portal_core::types::{ApiEnvelope, Product, ProductId};

fn checked(mut draft: ProductDraft) -> Result<ProductDraft, AppError> {
    draft.name = draft.name.trim().to_string();
    if draft.name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    Ok(draft)
}

/// `GET /api/products`
pub async fn list_products(State(state): State<AppState>) -> Json<ApiEnvelope<Vec<Product>>> {
    respond(state.repository.products().await, "Products loaded")
}

/// `GET /api/products/:id`
///
/// # Errors
///
/// 404 for an unknown id.
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ApiEnvelope<Product>>, AppError> {
    Ok(respond(state.repository.product(id).await?, "Product found"))
}

/// `POST /api/products` (admin)
///
/// # Errors
///
/// 422 without a name.
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(draft): ApiJson<ProductDraft>,
) -> Result<(StatusCode, Json<ApiEnvelope<Product>>), AppError> {
    let product = state.repository.create_product(checked(draft)?).await;
    tracing::info!(product_id = %product.id, by = %admin.user.id, name = %product.name, "Product created");
    Ok(created(product, "Product created"))
}

/// `PUT /api/products/:id` (admin)
///
/// # Errors
///
/// 422 without a name, 404 for an unknown id.
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    ApiJson(draft): ApiJson<ProductDraft>,
) -> Result<Json<ApiEnvelope<Product>>, AppError> {
    let product = state.repository.update_product(id, checked(draft)?).await?;
    tracing::info!(product_id = %id, by = %admin.user.id, "Product updated");
    Ok(respond(product, "Product updated"))
}

/// `DELETE /api/products/:id` (admin)
///
/// # Errors
///
/// 404 for an unknown id.
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<ApiEnvelope<()>>, AppError> {
    state.repository.delete_product(id).await?;
    tracing::info!(product_id = %id, by = %admin.user.id, "Product deleted");
    Ok(done("Product deleted"))
}
