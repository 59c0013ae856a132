use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower::ServiceExt;

use biblio::cache::{MemoryStore, QueryCache};
use biblio::infra::db::{SqliteRepositories, seed};
use biblio::infra::http::{self, ApiState};

fn build_app(pool: SqlitePool) -> Router {
    let cache = QueryCache::new(
        Arc::new(MemoryStore::new(
            NonZeroUsize::new(64).expect("capacity is non-zero"),
        )),
        Duration::from_secs(60),
        true,
    );
    let state = ApiState::new(SqliteRepositories::new(pool), cache);
    http::build_router(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(payload) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should collect");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body should be JSON")
    };
    (status, body)
}

async fn create_author(app: &Router, payload: Value) -> i64 {
    let (status, body) = send(app, Method::POST, "/api/v1/authors", Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED, "create author: {body}");
    body["data"]["id"].as_i64().expect("created author id")
}

async fn create_book(app: &Router, author_id: i64, title: &str) -> i64 {
    let payload = json!({
        "title": title,
        "publish_date": "1970-01-01",
        "author_id": author_id,
    });
    let (status, body) = send(app, Method::POST, "/api/v1/books", Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED, "create book: {body}");
    body["data"]["id"].as_i64().expect("created book id")
}

// ============ Create / read ============

#[sqlx::test(migrations = "./migrations")]
async fn creating_an_author_returns_the_enveloped_record(pool: SqlitePool) {
    let app = build_app(pool);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/authors",
        Some(json!({
            "name": "Ursula K. Le Guin",
            "bio": "Wrote the Earthsea cycle.",
            "birth_date": "1929-10-21",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Author created successfully");
    assert_eq!(body["data"]["name"], "Ursula K. Le Guin");
    assert_eq!(body["data"]["bio"], "Wrote the Earthsea cycle.");
    assert_eq!(body["data"]["birth_date"], "1929-10-21");
    assert!(body["data"]["id"].as_i64().expect("id is an integer") >= 1);
    assert!(body["data"]["created_at"].is_string());
    assert!(body["data"]["updated_at"].is_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn fetching_an_author_serves_the_untruncated_bio(pool: SqlitePool) {
    let app = build_app(pool);
    let long_bio = "word ".repeat(30).trim_end().to_string();
    let id = create_author(&app, json!({"name": "Prolific", "bio": long_bio})).await;

    let (status, body) = send(&app, Method::GET, &format!("/api/v1/authors/{id}"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["bio"].as_str().expect("bio"), long_bio);
    let envelope = body.as_object().expect("envelope is an object");
    assert!(!envelope.contains_key("message"));
}

#[sqlx::test(migrations = "./migrations")]
async fn fetching_a_missing_author_is_a_404(pool: SqlitePool) {
    let app = build_app(pool);

    let (status, body) = send(&app, Method::GET, "/api/v1/authors/999", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"message": "Author not found"}));
}

// ============ Validation ============

#[sqlx::test(migrations = "./migrations")]
async fn creating_an_author_without_a_name_is_unprocessable(pool: SqlitePool) {
    let app = build_app(pool);

    let (status, body) = send(&app, Method::POST, "/api/v1/authors", Some(json!({}))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "The name field is required.");
    assert_eq!(body["errors"]["name"][0], "The name field is required.");
}

#[sqlx::test(migrations = "./migrations")]
async fn blank_strings_read_as_missing(pool: SqlitePool) {
    let app = build_app(pool);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/authors",
        Some(json!({"name": ""})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["name"][0], "The name field is required.");
}

#[sqlx::test(migrations = "./migrations")]
async fn a_non_json_body_validates_like_an_empty_one(pool: SqlitePool) {
    let app = build_app(pool);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/authors")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("this is not json"))
        .expect("request should build");
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should collect");
    let body: Value = serde_json::from_slice(&bytes).expect("body should be JSON");
    assert_eq!(body["errors"]["name"][0], "The name field is required.");
}

#[sqlx::test(migrations = "./migrations")]
async fn an_invalid_birth_date_is_reported(pool: SqlitePool) {
    let app = build_app(pool);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/authors",
        Some(json!({"name": "Ok", "birth_date": "not-a-date"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"]["birth_date"][0],
        "The birth date field must be a valid date."
    );
}

// ============ Update / delete ============

#[sqlx::test(migrations = "./migrations")]
async fn updating_an_author_changes_only_the_sent_fields(pool: SqlitePool) {
    let app = build_app(pool);
    let id = create_author(
        &app,
        json!({"name": "Before", "bio": "kept as is", "birth_date": "1950-06-15"}),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/authors/{id}"),
        Some(json!({"name": "After"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Author updated successfully");
    assert_eq!(body["data"]["name"], "After");
    assert_eq!(body["data"]["bio"], "kept as is");
    assert_eq!(body["data"]["birth_date"], "1950-06-15");

    let (_, body) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/authors/{id}"),
        Some(json!({"bio": null})),
    )
    .await;
    assert_eq!(body["data"]["bio"], Value::Null);
    assert_eq!(body["data"]["name"], "After");
}

#[sqlx::test(migrations = "./migrations")]
async fn updating_a_missing_author_is_a_404(pool: SqlitePool) {
    let app = build_app(pool);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/v1/authors/999",
        Some(json!({"name": "Ghost"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"message": "Author not found"}));
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_an_author_returns_no_content(pool: SqlitePool) {
    let app = build_app(pool);
    let id = create_author(&app, json!({"name": "Short lived"})).await;

    let (status, body) = send(&app, Method::DELETE, &format!("/api/v1/authors/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, Method::GET, &format!("/api/v1/authors/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_an_author_with_books_is_a_conflict(pool: SqlitePool) {
    let app = build_app(pool);
    let id = create_author(&app, json!({"name": "Referenced"})).await;
    create_book(&app, id, "Still on the shelf").await;

    let (status, body) = send(&app, Method::DELETE, &format!("/api/v1/authors/{id}"), None).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({"message": "Author still has books"}));

    let (status, _) = send(&app, Method::GET, &format!("/api/v1/authors/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_missing_author_is_a_404(pool: SqlitePool) {
    let app = build_app(pool);

    let (status, body) = send(&app, Method::DELETE, "/api/v1/authors/999", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"message": "Author not found"}));
}

// ============ Listing ============

#[sqlx::test(migrations = "./migrations")]
async fn author_listing_carries_links_and_meta(pool: SqlitePool) {
    let app = build_app(pool);
    for name in ["One", "Two", "Three"] {
        create_author(&app, json!({"name": name})).await;
    }

    let (status, body) = send(&app, Method::GET, "/api/v1/authors?perPage=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["items"].as_array().expect("items").len(), 2);
    assert_eq!(data["links"]["first"], "/api/v1/authors?page=1");
    assert_eq!(data["links"]["prev"], Value::Null);
    assert_eq!(data["links"]["next"], "/api/v1/authors?page=2");
    assert_eq!(data["meta"]["current_page"], 1);
    assert_eq!(data["meta"]["from"], 1);
    assert_eq!(data["meta"]["to"], 2);
    assert_eq!(data["meta"]["per_page"], 2);
    assert_eq!(data["meta"]["path"], "/api/v1/authors");

    let (_, body) = send(&app, Method::GET, "/api/v1/authors?perPage=2&page=2", None).await;
    let data = &body["data"];
    assert_eq!(data["items"].as_array().expect("items").len(), 1);
    assert_eq!(data["items"][0]["name"], "Three");
    assert_eq!(data["links"]["prev"], "/api/v1/authors?page=1");
    assert_eq!(data["links"]["next"], Value::Null);
    assert_eq!(data["meta"]["from"], 3);
    assert_eq!(data["meta"]["to"], 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn author_listing_validates_paging_parameters(pool: SqlitePool) {
    let app = build_app(pool);

    let (status, body) = send(&app, Method::GET, "/api/v1/authors?page=0", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["page"][0], "The page field must be at least 1.");

    let (status, body) = send(&app, Method::GET, "/api/v1/authors?perPage=abc", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"]["perPage"][0],
        "The per page field must be an integer."
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn author_search_filters_by_name(pool: SqlitePool) {
    let app = build_app(pool);
    create_author(&app, json!({"name": "Ada Lovelace"})).await;
    create_author(&app, json!({"name": "Alan Turing"})).await;

    let (status, body) = send(&app, Method::GET, "/api/v1/authors?search=Ada", None).await;

    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["items"].as_array().expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Ada Lovelace");

    let (status, body) = send(&app, Method::GET, "/api/v1/authors?search=Al", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"]["search"][0],
        "The search field must be at least 3 characters."
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn an_empty_search_value_fails_the_string_rule(pool: SqlitePool) {
    let app = build_app(pool);

    let (status, body) = send(&app, Method::GET, "/api/v1/authors?search=", None).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"]["search"][0],
        "The search field must be a string."
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn listing_truncates_long_bios(pool: SqlitePool) {
    let app = build_app(pool);
    let long_bio = "word ".repeat(30).trim_end().to_string();
    create_author(&app, json!({"name": "Talkative", "bio": long_bio})).await;

    let (_, body) = send(&app, Method::GET, "/api/v1/authors", None).await;

    let bio = body["data"]["items"][0]["bio"].as_str().expect("bio");
    assert!(bio.ends_with("..."));
    assert_eq!(bio.split_whitespace().count(), 20);
}

// ============ Author books ============

#[sqlx::test(migrations = "./migrations")]
async fn author_books_listing_pages_with_totals(pool: SqlitePool) {
    let app = build_app(pool);
    let id = create_author(&app, json!({"name": "Busy"})).await;
    for title in ["First", "Second", "Third"] {
        create_book(&app, id, title).await;
    }

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/authors/{id}/books?perPage=2"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["items"].as_array().expect("items").len(), 2);
    assert_eq!(data["meta"]["total"], 3);
    assert_eq!(data["meta"]["last_page"], 2);
    assert_eq!(data["meta"]["path"], format!("/api/v1/authors/{id}/books"));
    assert_eq!(
        data["links"]["next"],
        format!("/api/v1/authors/{id}/books?page=2")
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn author_books_honors_a_custom_page_name(pool: SqlitePool) {
    let app = build_app(pool);
    let id = create_author(&app, json!({"name": "Busy"})).await;
    for title in ["First", "Second", "Third"] {
        create_book(&app, id, title).await;
    }

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/authors/{id}/books?perPage=2&pageName=p&p=2"),
        None,
    )
    .await;

    let data = &body["data"];
    assert_eq!(data["meta"]["current_page"], 2);
    assert_eq!(data["items"].as_array().expect("items").len(), 1);
    assert_eq!(data["items"][0]["title"], "Third");
    assert_eq!(
        data["links"]["prev"],
        format!("/api/v1/authors/{id}/books?p=1")
    );
    assert_eq!(data["links"]["next"], Value::Null);
}

#[sqlx::test(migrations = "./migrations")]
async fn author_books_accepts_a_caller_supplied_total(pool: SqlitePool) {
    let app = build_app(pool);
    let id = create_author(&app, json!({"name": "Busy"})).await;
    create_book(&app, id, "Only one").await;

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/authors/{id}/books?perPage=2&total=50"),
        None,
    )
    .await;

    let data = &body["data"];
    assert_eq!(data["meta"]["total"], 50);
    assert_eq!(data["meta"]["last_page"], 25);
}

#[sqlx::test(migrations = "./migrations")]
async fn author_books_for_a_missing_author_is_a_404(pool: SqlitePool) {
    let app = build_app(pool);

    let (status, body) = send(&app, Method::GET, "/api/v1/authors/999/books", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"message": "Author not found"}));
}

// ============ End to end ============

#[sqlx::test(migrations = "./migrations")]
async fn a_seeded_catalog_pages_creates_and_deletes(pool: SqlitePool) {
    let db = SqliteRepositories::new(pool.clone());
    seed::run(&db, 50, 0).await.expect("seeding should succeed");
    let app = build_app(pool);

    let (status, body) = send(&app, Method::GET, "/api/v1/authors?perPage=5&page=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let page_two: Vec<i64> = body["data"]["items"]
        .as_array()
        .expect("items")
        .iter()
        .map(|item| item["id"].as_i64().expect("id"))
        .collect();
    assert_eq!(page_two.len(), 5);
    assert_eq!(body["data"]["meta"]["current_page"], 2);

    let (_, body) = send(&app, Method::GET, "/api/v1/authors?perPage=5", None).await;
    let page_one: Vec<i64> = body["data"]["items"]
        .as_array()
        .expect("items")
        .iter()
        .map(|item| item["id"].as_i64().expect("id"))
        .collect();
    assert!(page_one.iter().all(|id| !page_two.contains(id)));

    let new_id = create_author(&app, json!({"name": "X"})).await;
    let (status, body) = send(&app, Method::GET, &format!("/api/v1/authors/{new_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "X");

    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/authors/{new_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, &format!("/api/v1/authors/{new_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Author not found");
}
