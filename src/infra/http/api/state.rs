use std::sync::Arc;

use crate::application::authors::AuthorService;
use crate::application::books::BookService;
use crate::cache::QueryCache;
use crate::infra::db::SqliteRepositories;

#[derive(Clone)]
pub struct ApiState {
    pub authors: AuthorService,
    pub books: BookService,
    pub db: SqliteRepositories,
}

impl ApiState {
    /// Wire both services onto one pool. The cache is shared so an author
    /// write can drop entries regardless of which service stored them.
    pub fn new(db: SqliteRepositories, cache: QueryCache) -> Self {
        let repos = Arc::new(db.clone());
        let authors = AuthorService::new(
            repos.clone(),
            repos.clone(),
            repos.clone(),
            cache.clone(),
        );
        let books = BookService::new(repos.clone(), repos.clone(), repos, cache);
        Self { authors, books, db }
    }
}
