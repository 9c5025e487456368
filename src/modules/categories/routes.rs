use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;

use catalog_http::{ApiJson, ApiPath, AppError};

use super::models::{Category, CategoryWithBooks, CreateCategory, UpdateCategory};
use crate::store::{CatalogStore, StoreError};
use crate::utils;

pub type Store = Arc<dyn CatalogStore>;

pub(crate) fn not_found(id: i64) -> AppError {
    AppError::not_found(format!("category with id {id} not found"))
}

fn duplicate_title(title: &str) -> AppError {
    AppError::conflict(
        vec![json!({ "field": "title", "error": "duplicate" })],
        format!("category with title '{title}' already exists"),
    )
}

fn map_write_error(error: StoreError, title: &str) -> AppError {
    match error {
        StoreError::Conflict(_) => duplicate_title(title),
        other => other.into(),
    }
}

/// GET /categories
pub async fn list_categories(State(store): State<Store>) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(store.list_categories().await?))
}

/// GET /categories/{id}
pub async fn get_category(
    State(store): State<Store>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Category>, AppError> {
    store
        .get_category(id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// HEAD /categories/{id}
pub async fn category_exists(
    State(store): State<Store>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    match store.get_category(id).await? {
        Some(_) => Ok(StatusCode::OK),
        None => Err(not_found(id)),
    }
}

/// POST /categories
pub async fn create_category(
    State(store): State<Store>,
    ApiJson(payload): ApiJson<CreateCategory>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    utils::ensure_not_blank("title", &payload.title)?;

    let category = store
        .create_category(&payload.title)
        .await
        .map_err(|e| map_write_error(e, &payload.title))?;

    tracing::info!(category_id = category.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /categories/{id}
pub async fn update_category(
    State(store): State<Store>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateCategory>,
) -> Result<Json<Category>, AppError> {
    let title = payload.title.unwrap_or_default();
    utils::ensure_not_blank("title", &title)?;

    let category = store
        .update_category(id, &title)
        .await
        .map_err(|e| map_write_error(e, &title))?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(category_id = id, "category updated");
    Ok(Json(category))
}

/// DELETE /categories/{id}
///
/// Books in the category are kept; their `category_id` becomes null.
pub async fn delete_category(
    State(store): State<Store>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    if !store.delete_category(id).await? {
        return Err(not_found(id));
    }

    tracing::info!(category_id = id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /categories/{id}/books
pub async fn category_books(
    State(store): State<Store>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<CategoryWithBooks>, AppError> {
    let category = store.get_category(id).await?.ok_or_else(|| not_found(id))?;
    let books = store.list_books(Some(id)).await?;
    Ok(Json(CategoryWithBooks { category, books }))
}
