use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, Transaction};
use time::{Date, OffsetDateTime};

use crate::{
    application::pagination::{
        BookCursor, CountedPage, CursorDirection, CursorPage, OffsetRequest, PageRequest,
    },
    application::repos::{
        BookQueryFilter, BookWithAuthor, BooksRepo, BooksWriteRepo, CreateBookParams, RepoError,
        UpdateBookParams,
    },
    domain::catalog::{BookRecord, RelatedAuthor},
};

use super::{SqliteRepositories, map_sqlx_error};

const BOOK_COLUMNS_SQL: &str =
    "id, title, description, publish_date, author_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookRow {
    id: i64,
    title: String,
    description: Option<String>,
    publish_date: Date,
    author_id: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<BookRow> for BookRecord {
    fn from(row: BookRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            publish_date: row.publish_date,
            author_id: row.author_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookAuthorRow {
    id: i64,
    title: String,
    description: Option<String>,
    publish_date: Date,
    author_id: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    related_id: Option<i64>,
    related_name: Option<String>,
    related_bio: Option<String>,
    related_birth_date: Option<Date>,
    related_created_at: Option<OffsetDateTime>,
    related_updated_at: Option<OffsetDateTime>,
}

impl From<BookAuthorRow> for BookWithAuthor {
    fn from(row: BookAuthorRow) -> Self {
        // A dangling author_id yields the all-null placeholder relation.
        let author = if row.related_id.is_some() {
            RelatedAuthor {
                id: row.related_id,
                name: row.related_name,
                bio: row.related_bio,
                birth_date: row.related_birth_date,
                created_at: row.related_created_at,
                updated_at: row.related_updated_at,
            }
        } else {
            RelatedAuthor::placeholder()
        };

        Self {
            book: BookRecord {
                id: row.id,
                title: row.title,
                description: row.description,
                publish_date: row.publish_date,
                author_id: row.author_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            author,
        }
    }
}

#[async_trait]
impl BooksRepo for SqliteRepositories {
    async fn list_books(
        &self,
        filter: &BookQueryFilter,
        page: PageRequest<BookCursor>,
    ) -> Result<CursorPage<BookRecord>, RepoError> {
        let limit = page.limit as i64;

        let mut qb =
            QueryBuilder::new(format!("SELECT {BOOK_COLUMNS_SQL} FROM books WHERE 1=1 "));
        Self::apply_book_filter(&mut qb, filter);

        // Pages walk the id sequence; a `before` cursor scans backwards and
        // is flipped to ascending order afterwards.
        match page.cursor {
            Some(cursor) if cursor.direction() == CursorDirection::Before => {
                qb.push(" AND id < ");
                qb.push_bind(cursor.id());
                qb.push(" ORDER BY id DESC LIMIT ");
                qb.push_bind(limit + 1);
            }
            Some(cursor) => {
                qb.push(" AND id > ");
                qb.push_bind(cursor.id());
                qb.push(" ORDER BY id ASC LIMIT ");
                qb.push_bind(limit + 1);
            }
            None => {
                qb.push(" ORDER BY id ASC LIMIT ");
                qb.push_bind(limit + 1);
            }
        }

        let mut rows: Vec<BookRow> = qb
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let has_more = (rows.len() as i64) > limit;
        if has_more {
            rows.pop();
        }

        let backwards = matches!(
            page.cursor,
            Some(cursor) if cursor.direction() == CursorDirection::Before
        );
        if backwards {
            rows.reverse();
        }

        let items: Vec<BookRecord> = rows.into_iter().map(BookRecord::from).collect();

        // Going forward there is always something behind the cursor; going
        // backward there is always something ahead of it.
        let prev_cursor = if backwards && !has_more {
            None
        } else if backwards || page.cursor.is_some() {
            items
                .first()
                .map(|book| BookCursor::before(book.id).encode())
        } else {
            None
        };

        let next_cursor = if backwards || has_more {
            items.last().map(|book| BookCursor::after(book.id).encode())
        } else {
            None
        };

        Ok(CursorPage::new(items, prev_cursor, next_cursor))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<BookWithAuthor>, RepoError> {
        let row: Option<BookAuthorRow> = sqlx::query_as(
            "SELECT b.id, b.title, b.description, b.publish_date, b.author_id, \
                    b.created_at, b.updated_at, \
                    a.id AS related_id, a.name AS related_name, a.bio AS related_bio, \
                    a.birth_date AS related_birth_date, a.created_at AS related_created_at, \
                    a.updated_at AS related_updated_at \
             FROM books b \
             LEFT JOIN authors a ON a.id = b.author_id \
             WHERE b.id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(BookWithAuthor::from))
    }

    async fn list_author_books(
        &self,
        author_id: i64,
        page: OffsetRequest,
        known_total: Option<u64>,
    ) -> Result<CountedPage<BookRecord>, RepoError> {
        let total = match known_total {
            Some(total) => total,
            None => self.count_author_books(author_id).await?,
        };

        let rows: Vec<BookRow> = sqlx::query_as(
            "SELECT id, title, description, publish_date, author_id, created_at, updated_at \
             FROM books WHERE author_id = ? ORDER BY id ASC LIMIT ? OFFSET ?",
        )
        .bind(author_id)
        .bind(page.per_page as i64)
        .bind(page.offset())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(CountedPage {
            items: rows.into_iter().map(BookRecord::from).collect(),
            current_page: page.page,
            per_page: page.per_page,
            total,
        })
    }

    async fn count_author_books(&self, author_id: i64) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}

#[async_trait]
impl BooksWriteRepo for SqliteRepositories {
    async fn create_book(&self, params: CreateBookParams) -> Result<BookRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        ensure_author_exists(&mut tx, params.author_id).await?;

        let row: BookRow = sqlx::query_as(
            "INSERT INTO books (title, description, publish_date, author_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             RETURNING id, title, description, publish_date, author_id, created_at, updated_at",
        )
        .bind(&params.title)
        .bind(&params.description)
        .bind(params.publish_date)
        .bind(params.author_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(BookRecord::from(row))
    }

    async fn update_book(&self, id: i64, params: UpdateBookParams) -> Result<BookRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let existing: Option<BookRow> = sqlx::query_as(
            "SELECT id, title, description, publish_date, author_id, created_at, updated_at \
             FROM books WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        let Some(existing) = existing else {
            return Err(RepoError::NotFound);
        };

        // A patch with no recognized field leaves the row untouched,
        // timestamps included.
        if params.is_empty() {
            return Ok(BookRecord::from(existing));
        }

        if let Some(author_id) = params.author_id {
            ensure_author_exists(&mut tx, author_id).await?;
        }

        let UpdateBookParams {
            title,
            description,
            publish_date,
            author_id,
        } = params;

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE books SET ");
        let mut set = qb.separated(", ");
        if let Some(title) = title {
            set.push("title = ");
            set.push_bind_unseparated(title);
        }
        if let Some(description) = description {
            set.push("description = ");
            set.push_bind_unseparated(description);
        }
        if let Some(publish_date) = publish_date {
            set.push("publish_date = ");
            set.push_bind_unseparated(publish_date);
        }
        if let Some(author_id) = author_id {
            set.push("author_id = ");
            set.push_bind_unseparated(author_id);
        }
        set.push("updated_at = ");
        set.push_bind_unseparated(OffsetDateTime::now_utc());

        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(" RETURNING id, title, description, publish_date, author_id, created_at, updated_at");

        let row: BookRow = qb
            .build_query_as()
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(BookRecord::from(row))
    }

    async fn delete_book(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

/// Books only ever point at live authors; the check shares the write
/// transaction so the reference cannot vanish mid-flight.
async fn ensure_author_exists(
    tx: &mut Transaction<'_, Sqlite>,
    author_id: i64,
) -> Result<(), RepoError> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM authors WHERE id = ?")
        .bind(author_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

    if found.is_none() {
        return Err(RepoError::integrity("book author does not exist"));
    }
    Ok(())
}

impl SqliteRepositories {
    fn apply_book_filter<'q>(qb: &mut QueryBuilder<'q, Sqlite>, filter: &'q BookQueryFilter) {
        if let Some(search) = filter.search.as_ref() {
            let pattern = format!("%{search}%");
            qb.push(" AND (");
            qb.push("title LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR COALESCE(description, '') LIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }

        if let Some(publish_date) = filter.publish_date {
            qb.push(" AND publish_date = ");
            qb.push_bind(publish_date);
            qb.push(" ");
        }
    }
}
