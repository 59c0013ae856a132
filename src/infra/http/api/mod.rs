pub mod error;
pub mod handlers;
pub mod models;
pub mod state;
pub mod validate;

pub use state::ApiState;

use axum::{Router, routing::get};

pub fn build_api_router() -> Router<ApiState> {
    Router::new()
        .route(
            "/api/v1/authors",
            get(handlers::list_authors).post(handlers::create_author),
        )
        .route(
            "/api/v1/authors/{id}",
            get(handlers::get_author)
                .put(handlers::update_author)
                .delete(handlers::delete_author),
        )
        .route(
            "/api/v1/authors/{id}/books",
            get(handlers::list_author_books),
        )
        .route(
            "/api/v1/books",
            get(handlers::list_books).post(handlers::create_book),
        )
        .route(
            "/api/v1/books/{id}",
            get(handlers::get_book)
                .put(handlers::update_book)
                .delete(handlers::delete_book),
        )
}
