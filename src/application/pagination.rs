//! Pagination primitives shared across repositories.
//!
//! Three strategies coexist: simple offset pages for the author listing,
//! counted offset pages for the author-books listing, and cursor pages for
//! the book listing.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page size applied when a listing request does not name one.
pub const DEFAULT_PER_PAGE: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorDirection {
    After,
    Before,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct BookCursorPayload {
    id: i64,
    direction: CursorDirection,
}

/// Cursor addressing a book row by id plus the fetch direction relative to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookCursor {
    id: i64,
    direction: CursorDirection,
}

impl BookCursor {
    /// Cursor for the page following the given row.
    pub fn after(id: i64) -> Self {
        Self {
            id,
            direction: CursorDirection::After,
        }
    }

    /// Cursor for the page preceding the given row.
    pub fn before(id: i64) -> Self {
        Self {
            id,
            direction: CursorDirection::Before,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn direction(&self) -> CursorDirection {
        self.direction
    }

    pub fn encode(&self) -> String {
        let payload = BookCursorPayload {
            id: self.id,
            direction: self.direction,
        };
        let serialized =
            serde_json::to_vec(&payload).expect("serializing book cursor payload should succeed");
        URL_SAFE_NO_PAD.encode(serialized)
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        let payload: BookCursorPayload = serde_json::from_slice(&bytes)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        Ok(Self {
            id: payload.id,
            direction: payload.direction,
        })
    }
}

/// Cursor-aware pagination request.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<C> {
    pub limit: u32,
    pub cursor: Option<C>,
}

impl<C> PageRequest<C> {
    pub fn new(limit: u32, cursor: Option<C>) -> Self {
        Self { limit, cursor }
    }
}

/// Offset pagination request. `page` starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetRequest {
    pub page: u32,
    pub per_page: u32,
}

impl OffsetRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    /// Number of rows to skip before this page.
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }
}

impl Default for OffsetRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Offset page result where only the presence of a following page is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplePage<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub has_more: bool,
}

impl<T> SimplePage<T> {
    /// 1-based ordinal of the first row on this page, when the page has rows.
    pub fn first_item(&self) -> Option<u64> {
        (!self.items.is_empty())
            .then(|| u64::from(self.current_page.saturating_sub(1)) * u64::from(self.per_page) + 1)
    }

    /// 1-based ordinal of the last row on this page.
    pub fn last_item(&self) -> Option<u64> {
        self.first_item()
            .map(|first| first + self.items.len() as u64 - 1)
    }
}

/// Offset page result carrying the total row count for the filtered set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountedPage<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl<T> CountedPage<T> {
    /// Number of the final page; never below 1, even for an empty set.
    pub fn last_page(&self) -> u32 {
        let per_page = u64::from(self.per_page.max(1));
        let pages = self.total.div_ceil(per_page).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn first_item(&self) -> Option<u64> {
        (!self.items.is_empty())
            .then(|| u64::from(self.current_page.saturating_sub(1)) * u64::from(self.per_page) + 1)
    }

    pub fn last_item(&self) -> Option<u64> {
        self.first_item()
            .map(|first| first + self.items.len() as u64 - 1)
    }
}

/// Cursor-aware page result with links in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub prev_cursor: Option<String>,
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            prev_cursor: None,
            next_cursor: None,
        }
    }

    pub fn new(items: Vec<T>, prev_cursor: Option<String>, next_cursor: Option<String>) -> Self {
        Self {
            items,
            prev_cursor,
            next_cursor,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PaginationError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}
