use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};
use time::{Date, OffsetDateTime};

use crate::{
    application::pagination::{OffsetRequest, SimplePage},
    application::repos::{
        AuthorQueryFilter, AuthorsRepo, AuthorsWriteRepo, CreateAuthorParams, RepoError,
        UpdateAuthorParams,
    },
    domain::catalog::AuthorRecord,
};

use super::{SqliteRepositories, map_sqlx_error};

const AUTHOR_COLUMNS_SQL: &str = "id, name, bio, birth_date, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct AuthorRow {
    id: i64,
    name: String,
    bio: Option<String>,
    birth_date: Option<Date>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<AuthorRow> for AuthorRecord {
    fn from(row: AuthorRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            bio: row.bio,
            birth_date: row.birth_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl AuthorsRepo for SqliteRepositories {
    async fn list_authors(
        &self,
        filter: &AuthorQueryFilter,
        page: OffsetRequest,
    ) -> Result<SimplePage<AuthorRecord>, RepoError> {
        let limit = page.per_page as i64;

        let mut qb = QueryBuilder::new(format!(
            "SELECT {AUTHOR_COLUMNS_SQL} FROM authors WHERE 1=1 "
        ));
        Self::apply_author_filter(&mut qb, filter);
        // One extra row tells us whether a further page exists.
        qb.push(" ORDER BY id ASC LIMIT ");
        qb.push_bind(limit + 1);
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let mut rows: Vec<AuthorRow> = qb
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let has_more = (rows.len() as i64) > limit;
        if has_more {
            rows.pop();
        }

        Ok(SimplePage {
            items: rows.into_iter().map(AuthorRecord::from).collect(),
            current_page: page.page,
            per_page: page.per_page,
            has_more,
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<AuthorRecord>, RepoError> {
        let row: Option<AuthorRow> = sqlx::query_as(
            "SELECT id, name, bio, birth_date, created_at, updated_at \
             FROM authors WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AuthorRecord::from))
    }
}

#[async_trait]
impl AuthorsWriteRepo for SqliteRepositories {
    async fn create_author(&self, params: CreateAuthorParams) -> Result<AuthorRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let row: AuthorRow = sqlx::query_as(
            "INSERT INTO authors (name, bio, birth_date, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             RETURNING id, name, bio, birth_date, created_at, updated_at",
        )
        .bind(&params.name)
        .bind(&params.bio)
        .bind(params.birth_date)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(AuthorRecord::from(row))
    }

    async fn update_author(
        &self,
        id: i64,
        params: UpdateAuthorParams,
    ) -> Result<AuthorRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let existing: Option<AuthorRow> = sqlx::query_as(
            "SELECT id, name, bio, birth_date, created_at, updated_at \
             FROM authors WHERE id = ?",
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
            return Ok(AuthorRecord::from(existing));
        }

        let UpdateAuthorParams {
            name,
            bio,
            birth_date,
        } = params;

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE authors SET ");
        let mut set = qb.separated(", ");
        if let Some(name) = name {
            set.push("name = ");
            set.push_bind_unseparated(name);
        }
        if let Some(bio) = bio {
            set.push("bio = ");
            set.push_bind_unseparated(bio);
        }
        if let Some(birth_date) = birth_date {
            set.push("birth_date = ");
            set.push_bind_unseparated(birth_date);
        }
        set.push("updated_at = ");
        set.push_bind_unseparated(OffsetDateTime::now_utc());

        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(" RETURNING id, name, bio, birth_date, created_at, updated_at");

        let row: AuthorRow = qb
            .build_query_as()
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(AuthorRecord::from(row))
    }

    async fn delete_author(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM authors WHERE id = ?")
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

impl SqliteRepositories {
    fn apply_author_filter<'q>(qb: &mut QueryBuilder<'q, Sqlite>, filter: &'q AuthorQueryFilter) {
        if let Some(name) = filter.name.as_ref() {
            qb.push(" AND name LIKE ");
            qb.push_bind(format!("%{name}%"));
            qb.push(" ");
        }
    }
}
