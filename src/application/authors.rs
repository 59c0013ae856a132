//! Author catalog operations.

use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::{OffsetRequest, SimplePage};
use crate::application::repos::{
    AuthorQueryFilter, AuthorsRepo, AuthorsWriteRepo, BooksRepo, CreateAuthorParams, RepoError,
    UpdateAuthorParams,
};
use crate::cache::{CacheKey, QueryCache};
use crate::domain::catalog::AuthorRecord;

#[derive(Debug, Error)]
pub enum AuthorError {
    #[error("author not found")]
    NotFound,
    #[error("author is referenced by {count} books")]
    HasBooks { count: u64 },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct AuthorService {
    reader: Arc<dyn AuthorsRepo>,
    writer: Arc<dyn AuthorsWriteRepo>,
    books: Arc<dyn BooksRepo>,
    cache: QueryCache,
}

impl AuthorService {
    pub fn new(
        reader: Arc<dyn AuthorsRepo>,
        writer: Arc<dyn AuthorsWriteRepo>,
        books: Arc<dyn BooksRepo>,
        cache: QueryCache,
    ) -> Self {
        Self {
            reader,
            writer,
            books,
            cache,
        }
    }

    pub async fn list(
        &self,
        filter: &AuthorQueryFilter,
        page: OffsetRequest,
    ) -> Result<SimplePage<AuthorRecord>, AuthorError> {
        let key = CacheKey::new("authors", "index")
            .opt_param("name", filter.name.as_deref())
            .param("page", page.page)
            .param("perPage", page.per_page);
        self.cache
            .remember(&key, || self.reader.list_authors(filter, page))
            .await
            .map_err(AuthorError::from)
    }

    /// Fetch one author. A missing id is an error and never enters the cache.
    pub async fn find(&self, id: i64) -> Result<AuthorRecord, AuthorError> {
        let key = CacheKey::scoped("authors", "show", id);
        self.cache
            .remember(&key, || async {
                let found = self.reader.find_by_id(id).await?;
                found.ok_or(AuthorError::NotFound)
            })
            .await
    }

    pub async fn create(&self, params: CreateAuthorParams) -> Result<AuthorRecord, AuthorError> {
        self.writer
            .create_author(params)
            .await
            .map_err(AuthorError::from)
    }

    pub async fn update(
        &self,
        id: i64,
        params: UpdateAuthorParams,
    ) -> Result<AuthorRecord, AuthorError> {
        let author = self
            .writer
            .update_author(id, params)
            .await
            .map_err(Self::map_write_error)?;
        self.cache.forget(&CacheKey::scoped("authors", "show", id));
        Ok(author)
    }

    /// Delete an author, refusing while any book still references it.
    pub async fn delete(&self, id: i64) -> Result<(), AuthorError> {
        let count = self.books.count_author_books(id).await?;
        if count > 0 {
            return Err(AuthorError::HasBooks { count });
        }

        self.writer
            .delete_author(id)
            .await
            .map_err(Self::map_write_error)?;
        self.cache.forget(&CacheKey::scoped("authors", "show", id));
        Ok(())
    }

    fn map_write_error(err: RepoError) -> AuthorError {
        match err {
            RepoError::NotFound => AuthorError::NotFound,
            other => AuthorError::Repo(other),
        }
    }
}
