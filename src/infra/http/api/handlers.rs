use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_extra::extract::Query;
use serde_json::Value;

use crate::application::authors::AuthorError;
use crate::application::books::BookError;
use crate::application::pagination::PageRequest;
use crate::application::repos::{AuthorQueryFilter, BookQueryFilter, RepoError};

use super::error::ApiError;
use super::models::{self, Envelope};
use super::state::ApiState;
use super::validate;

const AUTHORS_PATH: &str = "/api/v1/authors";
const BOOKS_PATH: &str = "/api/v1/books";

// ---- authors ----

pub async fn list_authors(
    State(state): State<ApiState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError> {
    let query = validate::author_index(&params)?;
    let filter = AuthorQueryFilter { name: query.search };

    let page = state
        .authors
        .list(&filter, query.page)
        .await
        .map_err(author_to_api)?;

    Ok(Json(Envelope::new(models::author_listing(
        &page,
        AUTHORS_PATH,
    ))))
}

pub async fn get_author(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let author = state.authors.find(id).await.map_err(author_to_api)?;
    Ok(Json(Envelope::new(author)))
}

pub async fn create_author(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let params = validate::author_store(&parse_body(&body))?;

    let author = state.authors.create(params).await.map_err(author_to_api)?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(author, "Author created successfully")),
    ))
}

pub async fn update_author(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let params = validate::author_update(&parse_body(&body))?;

    let author = state
        .authors
        .update(id, params)
        .await
        .map_err(author_to_api)?;

    Ok(Json(Envelope::with_message(
        author,
        "Author updated successfully",
    )))
}

pub async fn delete_author(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.authors.delete(id).await.map_err(author_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_author_books(
    State(state): State<ApiState>,
    Path(author_id): Path<i64>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError> {
    let query = validate::author_books(&params)?;

    let page = state
        .books
        .list_for_author(
            author_id,
            query.page,
            &query.page_name,
            query.total,
            query.columns.as_deref(),
        )
        .await
        .map_err(|err| match err {
            // Here the author is the addressed resource, not a body field.
            BookError::AuthorMissing => ApiError::not_found("Author not found"),
            other => book_to_api(other),
        })?;

    let path = format!("{AUTHORS_PATH}/{author_id}/books");
    Ok(Json(Envelope::new(models::author_books_listing(
        &page,
        &path,
        &query.page_name,
        query.columns.as_deref(),
    ))))
}

// ---- books ----

pub async fn list_books(
    State(state): State<ApiState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError> {
    let query = validate::book_index(&params)?;
    let filter = BookQueryFilter {
        search: query.search,
        publish_date: query.publish_date,
    };

    let page = state
        .books
        .list(
            &filter,
            PageRequest::new(query.per_page, query.cursor),
            query.columns.as_deref(),
        )
        .await
        .map_err(book_to_api)?;

    Ok(Json(Envelope::new(models::book_listing(
        &page,
        BOOKS_PATH,
        query.columns.as_deref(),
    ))))
}

pub async fn get_book(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let book = state.books.find(id).await.map_err(book_to_api)?;
    Ok(Json(Envelope::new(book)))
}

pub async fn create_book(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let params = validate::book_store(&parse_body(&body))?;

    let book = state.books.create(params).await.map_err(book_to_api)?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(book, "Book created successfully")),
    ))
}

pub async fn update_book(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let params = validate::book_update(&parse_body(&body))?;

    let book = state.books.update(id, params).await.map_err(book_to_api)?;

    Ok(Json(Envelope::with_message(
        book,
        "Book updated successfully",
    )))
}

pub async fn delete_book(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.books.delete(id).await.map_err(book_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- error mapping ----

/// A body that is not JSON validates like an empty one.
fn parse_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

fn author_to_api(err: AuthorError) -> ApiError {
    match err {
        AuthorError::NotFound => ApiError::not_found("Author not found"),
        AuthorError::HasBooks { .. } => ApiError::conflict("Author still has books"),
        AuthorError::Repo(repo) => repo_to_api(repo),
    }
}

fn book_to_api(err: BookError) -> ApiError {
    match err {
        BookError::NotFound => ApiError::not_found("Book not found"),
        BookError::AuthorMissing => validate::single_field_error(
            "author_id",
            validate::selected_invalid_message("author_id"),
        ),
        BookError::Repo(repo) => repo_to_api(repo),
    }
}

fn repo_to_api(err: RepoError) -> ApiError {
    // The body stays opaque; the cause travels on the error report instead.
    ApiError::server_error(err.to_string())
}
