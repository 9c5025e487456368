use axum::{extract::State, http::StatusCode, Json};

use catalog_http::{ApiJson, ApiPath, ApiQuery, AppError};

use super::models::{round_price, Book, BookPatch, ListBooksQuery, NewBook, SearchQuery};
use crate::modules::categories::routes::{self as categories, Store};
use crate::utils;

const MIN_SEARCH_CHARS: usize = 2;

fn not_found(id: i64) -> AppError {
    AppError::not_found(format!("book with id {id} not found"))
}

async fn ensure_category(store: &Store, id: i64) -> Result<(), AppError> {
    match store.get_category(id).await? {
        Some(_) => Ok(()),
        None => Err(categories::not_found(id)),
    }
}

/// GET /books?category_id=
pub async fn list_books(
    State(store): State<Store>,
    ApiQuery(query): ApiQuery<ListBooksQuery>,
) -> Result<Json<Vec<Book>>, AppError> {
    if let Some(category_id) = query.category_id {
        ensure_category(&store, category_id).await?;
    }
    Ok(Json(store.list_books(query.category_id).await?))
}

/// GET /books/search?q=
pub async fn search_books(
    State(store): State<Store>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<Book>>, AppError> {
    utils::ensure_min_chars("q", &query.q, MIN_SEARCH_CHARS)?;
    let books = store.search_books(&query.q).await?;
    tracing::debug!(query = %query.q, hits = books.len(), "book search");
    Ok(Json(books))
}

/// GET /books/{id}
pub async fn get_book(
    State(store): State<Store>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Book>, AppError> {
    store.get_book(id).await?.map(Json).ok_or_else(|| not_found(id))
}

/// POST /books
pub async fn create_book(
    State(store): State<Store>,
    ApiJson(mut payload): ApiJson<NewBook>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    payload.price = round_price(payload.price);
    utils::ensure_not_blank("title", &payload.title)?;
    utils::ensure_positive("price", payload.price)?;
    if let Some(category_id) = payload.category_id {
        ensure_category(&store, category_id).await?;
    }

    let book = store.create_book(&payload).await?;

    tracing::info!(book_id = book.id, category_id = ?book.category_id, "book created");
    Ok((StatusCode::CREATED, Json(book)))
}

/// PUT /books/{id}
///
/// Only the fields present in the body change. An explicit `null` clears
/// `description`, `url` or `category_id`.
pub async fn update_book(
    State(store): State<Store>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(mut patch): ApiJson<BookPatch>,
) -> Result<Json<Book>, AppError> {
    if store.get_book(id).await?.is_none() {
        return Err(not_found(id));
    }

    if let Some(title) = &patch.title {
        utils::ensure_not_blank("title", title)?;
    }
    patch.price = patch.price.map(round_price);
    if let Some(price) = patch.price {
        utils::ensure_positive("price", price)?;
    }
    if let Some(Some(category_id)) = patch.category_id {
        ensure_category(&store, category_id).await?;
    }

    let book = store
        .update_book(id, &patch)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(book_id = id, touch_only = patch.is_empty(), "book updated");
    Ok(Json(book))
}

/// DELETE /books/{id}
pub async fn delete_book(
    State(store): State<Store>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    if !store.delete_book(id).await? {
        return Err(not_found(id));
    }

    tracing::info!(book_id = id, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}
