//! Book catalog operations.

use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::{
    BookCursor, CountedPage, CursorPage, OffsetRequest, PageRequest,
};
use crate::application::repos::{
    AuthorsRepo, BookQueryFilter, BookWithAuthor, BooksRepo, BooksWriteRepo, CreateBookParams,
    RepoError, UpdateBookParams,
};
use crate::cache::{CacheKey, QueryCache};
use crate::domain::catalog::{BookRecord, format_date};

#[derive(Debug, Error)]
pub enum BookError {
    #[error("book not found")]
    NotFound,
    #[error("author does not exist")]
    AuthorMissing,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct BookService {
    reader: Arc<dyn BooksRepo>,
    writer: Arc<dyn BooksWriteRepo>,
    authors: Arc<dyn AuthorsRepo>,
    cache: QueryCache,
}

impl BookService {
    pub fn new(
        reader: Arc<dyn BooksRepo>,
        writer: Arc<dyn BooksWriteRepo>,
        authors: Arc<dyn AuthorsRepo>,
        cache: QueryCache,
    ) -> Self {
        Self {
            reader,
            writer,
            authors,
            cache,
        }
    }

    /// Cursor-paged catalog listing. `columns` only widens the cache key;
    /// trimming the payload to the selection happens at response assembly.
    pub async fn list(
        &self,
        filter: &BookQueryFilter,
        page: PageRequest<BookCursor>,
        columns: Option<&[&'static str]>,
    ) -> Result<CursorPage<BookRecord>, BookError> {
        let key = CacheKey::new("books", "index")
            .opt_param("search", filter.search.as_deref())
            .opt_param("publish_date", filter.publish_date.map(format_date))
            .opt_param("cursor", page.cursor.map(|cursor| cursor.encode()))
            .param("perPage", page.limit)
            .opt_param("columns", columns.map(|columns| columns.join(",")));
        self.cache
            .remember(&key, || self.reader.list_books(filter, page))
            .await
            .map_err(BookError::from)
    }

    /// Fetch one book with its author embedded. A missing id is an error and
    /// never enters the cache.
    pub async fn find(&self, id: i64) -> Result<BookWithAuthor, BookError> {
        let key = CacheKey::scoped("books", "show", id);
        self.cache
            .remember(&key, || async {
                let found = self.reader.find_by_id(id).await?;
                found.ok_or(BookError::NotFound)
            })
            .await
    }

    /// Page through one author's books with full pagination metadata.
    ///
    /// `known_total` short-circuits the count query when the client already
    /// holds the collection size from an earlier page.
    pub async fn list_for_author(
        &self,
        author_id: i64,
        page: OffsetRequest,
        page_name: &str,
        known_total: Option<u64>,
        columns: Option<&[&'static str]>,
    ) -> Result<CountedPage<BookRecord>, BookError> {
        let author = self.authors.find_by_id(author_id).await?;
        if author.is_none() {
            return Err(BookError::AuthorMissing);
        }

        let key = CacheKey::scoped("books", "author", author_id)
            .param("page", page.page)
            .param("perPage", page.per_page)
            .param("pageName", page_name)
            .opt_param("total", known_total)
            .opt_param("columns", columns.map(|columns| columns.join(",")));
        self.cache
            .remember(&key, || {
                self.reader.list_author_books(author_id, page, known_total)
            })
            .await
            .map_err(BookError::from)
    }

    pub async fn create(&self, params: CreateBookParams) -> Result<BookRecord, BookError> {
        self.writer
            .create_book(params)
            .await
            .map_err(Self::map_write_error)
    }

    pub async fn update(&self, id: i64, params: UpdateBookParams) -> Result<BookRecord, BookError> {
        let book = self
            .writer
            .update_book(id, params)
            .await
            .map_err(Self::map_write_error)?;
        self.cache.forget(&CacheKey::scoped("books", "show", id));
        Ok(book)
    }

    pub async fn delete(&self, id: i64) -> Result<(), BookError> {
        self.writer
            .delete_book(id)
            .await
            .map_err(Self::map_write_error)?;
        self.cache.forget(&CacheKey::scoped("books", "show", id));
        Ok(())
    }

    fn map_write_error(err: RepoError) -> BookError {
        match err {
            RepoError::NotFound => BookError::NotFound,
            RepoError::Integrity { .. } => BookError::AuthorMissing,
            other => BookError::Repo(other),
        }
    }
}
