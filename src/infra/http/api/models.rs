//! Response shapes for the catalog API.
//!
//! Successful responses wrap their payload in an envelope; listings are
//! assembled as JSON values so the word-level truncation and the column
//! selection can reshape items without another set of structs.

use serde::Serialize;
use serde_json::{Value, json};

use crate::application::columns;
use crate::application::pagination::{CountedPage, CursorPage, SimplePage};
use crate::domain::catalog::{AuthorRecord, BookRecord};
use crate::util::text::truncate_words;

/// Listings shorten free-form text so index pages stay scannable; the full
/// text is only served by the single-record endpoints.
const AUTHOR_BIO_WORDS: usize = 20;
const BOOK_DESCRIPTION_WORDS: usize = 50;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: &'static str) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.to_string()),
        }
    }
}

pub fn author_listing(page: &SimplePage<AuthorRecord>, path: &str) -> Value {
    let items: Vec<Value> = page.items.iter().map(author_item).collect();
    json!({
        "items": items,
        "links": {
            "first": page_url(path, "page", 1),
            "prev": (page.current_page > 1).then(|| page_url(path, "page", page.current_page - 1)),
            "next": page.has_more.then(|| page_url(path, "page", page.current_page + 1)),
        },
        "meta": {
            "current_page": page.current_page,
            "from": page.first_item(),
            "path": path,
            "per_page": page.per_page,
            "to": page.last_item(),
        },
    })
}

pub fn book_listing(
    page: &CursorPage<BookRecord>,
    path: &str,
    columns: Option<&[&'static str]>,
) -> Value {
    let items: Vec<Value> = page
        .items
        .iter()
        .map(|book| book_item(book, columns))
        .collect();
    json!({
        "items": items,
        "links": {
            "prev": page.prev_cursor.as_deref().map(|cursor| cursor_url(path, cursor)),
            "next": page.next_cursor.as_deref().map(|cursor| cursor_url(path, cursor)),
        },
    })
}

pub fn author_books_listing(
    page: &CountedPage<BookRecord>,
    path: &str,
    page_name: &str,
    columns: Option<&[&'static str]>,
) -> Value {
    let items: Vec<Value> = page
        .items
        .iter()
        .map(|book| book_item(book, columns))
        .collect();
    let last_page = page.last_page();
    json!({
        "items": items,
        "links": {
            "first": page_url(path, page_name, 1),
            "prev": (page.current_page > 1)
                .then(|| page_url(path, page_name, page.current_page - 1)),
            "next": (page.current_page < last_page)
                .then(|| page_url(path, page_name, page.current_page + 1)),
        },
        "meta": {
            "current_page": page.current_page,
            "from": page.first_item(),
            "last_page": last_page,
            "path": path,
            "per_page": page.per_page,
            "to": page.last_item(),
            "total": page.total,
        },
    })
}

fn author_item(author: &AuthorRecord) -> Value {
    let mut value =
        serde_json::to_value(author).expect("serializing an author record should succeed");
    shorten_field(&mut value, "bio", AUTHOR_BIO_WORDS);
    value
}

fn book_item(book: &BookRecord, columns: Option<&[&'static str]>) -> Value {
    let mut value = serde_json::to_value(book).expect("serializing a book record should succeed");
    shorten_field(&mut value, "description", BOOK_DESCRIPTION_WORDS);
    if let Some(columns) = columns {
        columns::project(&mut value, columns);
    }
    value
}

fn shorten_field(value: &mut Value, field: &str, limit: usize) {
    if let Some(Value::String(text)) = value.get_mut(field) {
        *text = truncate_words(text, limit);
    }
}

fn page_url(path: &str, page_name: &str, page: u32) -> String {
    format!("{path}?{page_name}={page}")
}

fn cursor_url(path: &str, cursor: &str) -> String {
    format!("{path}?cursor={cursor}")
}
