//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Date;

use crate::application::pagination::{
    BookCursor, CountedPage, CursorPage, OffsetRequest, PageRequest, PaginationError, SimplePage,
};
use crate::domain::catalog::{AuthorRecord, BookRecord, RelatedAuthor};

#[derive(Debug, Error, PartialEq)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

/// Predicates for the author listing.
#[derive(Debug, Clone, Default)]
pub struct AuthorQueryFilter {
    /// Case-insensitive substring match against the name column.
    pub name: Option<String>,
}

/// Predicates for the book listing.
#[derive(Debug, Clone, Default)]
pub struct BookQueryFilter {
    /// Case-insensitive substring match against title or description.
    pub search: Option<String>,
    /// Exact publish date match.
    pub publish_date: Option<Date>,
}

#[derive(Debug, Clone)]
pub struct CreateAuthorParams {
    pub name: String,
    pub bio: Option<String>,
    pub birth_date: Option<Date>,
}

/// Partial author update. An outer `None` leaves the column untouched; the
/// nested `Option` distinguishes clearing a nullable column from skipping it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateAuthorParams {
    pub name: Option<String>,
    pub bio: Option<Option<String>>,
    pub birth_date: Option<Option<Date>>,
}

impl UpdateAuthorParams {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.bio.is_none() && self.birth_date.is_none()
    }

    pub fn apply(self, record: &mut AuthorRecord) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(bio) = self.bio {
            record.bio = bio;
        }
        if let Some(birth_date) = self.birth_date {
            record.birth_date = birth_date;
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateBookParams {
    pub title: String,
    pub description: Option<String>,
    pub publish_date: Date,
    pub author_id: i64,
}

/// Partial book update; same outer/nested `Option` convention as authors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBookParams {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub publish_date: Option<Date>,
    pub author_id: Option<i64>,
}

impl UpdateBookParams {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.publish_date.is_none()
            && self.author_id.is_none()
    }

    pub fn apply(self, record: &mut BookRecord) {
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(publish_date) = self.publish_date {
            record.publish_date = publish_date;
        }
        if let Some(author_id) = self.author_id {
            record.author_id = author_id;
        }
    }
}

/// Single-book read model joined with its owning author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookWithAuthor {
    #[serde(flatten)]
    pub book: BookRecord,
    pub author: RelatedAuthor,
}

#[async_trait]
pub trait AuthorsRepo: Send + Sync {
    async fn list_authors(
        &self,
        filter: &AuthorQueryFilter,
        page: OffsetRequest,
    ) -> Result<SimplePage<AuthorRecord>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<AuthorRecord>, RepoError>;
}

#[async_trait]
pub trait AuthorsWriteRepo: Send + Sync {
    async fn create_author(&self, params: CreateAuthorParams) -> Result<AuthorRecord, RepoError>;

    async fn update_author(
        &self,
        id: i64,
        params: UpdateAuthorParams,
    ) -> Result<AuthorRecord, RepoError>;

    async fn delete_author(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait BooksRepo: Send + Sync {
    async fn list_books(
        &self,
        filter: &BookQueryFilter,
        page: PageRequest<BookCursor>,
    ) -> Result<CursorPage<BookRecord>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<BookWithAuthor>, RepoError>;

    /// Books owned by one author. `known_total` skips the count query when the
    /// caller already holds the total for the set.
    async fn list_author_books(
        &self,
        author_id: i64,
        page: OffsetRequest,
        known_total: Option<u64>,
    ) -> Result<CountedPage<BookRecord>, RepoError>;

    async fn count_author_books(&self, author_id: i64) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait BooksWriteRepo: Send + Sync {
    async fn create_book(&self, params: CreateBookParams) -> Result<BookRecord, RepoError>;

    async fn update_book(&self, id: i64, params: UpdateBookParams)
    -> Result<BookRecord, RepoError>;

    async fn delete_book(&self, id: i64) -> Result<(), RepoError>;
}
