use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;

use crate::data::post_repository::{NewPost, NewTag, PostPatch, PostRepository};
use crate::domain::error::DomainError;
use crate::domain::listing::{ListFilter, SortField};
use crate::domain::post::{Post, Tag};

const POST_COLUMNS: &str = "id, name, description, created_at, updated_at";
const TAG_COLUMNS: &str = "id, post_id, name, description, created_at, updated_at";

#[derive(Debug, Clone)]
pub(crate) struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_tags(&self, post_ids: Vec<i64>) -> Result<HashMap<i64, Vec<TagRow>>, DomainError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, TagRow>(&format!(
            "SELECT {TAG_COLUMNS} FROM tags WHERE post_id = ANY($1) AND deleted_at IS NULL ORDER BY id"
        ))
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| DomainError::unexpected("load tags", err))?;

        let mut by_post: HashMap<i64, Vec<TagRow>> = HashMap::new();
        for row in rows {
            by_post.entry(row.post_id).or_default().push(row);
        }
        Ok(by_post)
    }
}

#[derive(FromRow)]
struct PostRow {
    id: i64,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct TagRow {
    id: i64,
    post_id: i64,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create_post(&self, input: NewPost) -> Result<Post, DomainError> {
        let mut tx = begin(&self.pool).await?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts (name, description) VALUES ($1, $2) RETURNING {POST_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| DomainError::unexpected("insert post", err))?;

        let tags = insert_tags(&mut tx, row.id, &input.tags).await?;
        commit(tx).await?;

        map_row_to_post(row, tags)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, DomainError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| DomainError::unexpected("get post", err))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let tags = self.load_tags(vec![row.id]).await?.remove(&row.id);
        map_row_to_post(row, tags.unwrap_or_default()).map(Some)
    }

    async fn update_post(&self, id: i64, patch: PostPatch) -> Result<Option<Post>, DomainError> {
        let mut tx = begin(&self.pool).await?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            UPDATE posts
            SET name = $2,
                description = $3,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.description)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|err| DomainError::unexpected("update post", err))?;

        let Some(row) = row else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE tags
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE post_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|err| DomainError::unexpected("retire replaced tags", err))?;

        let tags = insert_tags(&mut tx, id, &patch.tags).await?;
        commit(tx).await?;

        map_row_to_post(row, tags).map(Some)
    }

    async fn delete_post(&self, id: i64) -> Result<bool, DomainError> {
        let mut tx = begin(&self.pool).await?;

        let tags = sqlx::query(
            r#"
            UPDATE tags
            SET deleted_at = NOW()
            WHERE post_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|err| DomainError::unexpected("delete tags", err))?;

        let post = sqlx::query(
            r#"
            UPDATE posts
            SET deleted_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|err| DomainError::unexpected("delete post", err))?;

        if post.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|err| DomainError::unexpected("rollback", err))?;
            return Ok(false);
        }

        commit(tx).await?;
        debug!(post_id = id, tags = tags.rows_affected(), "post soft-deleted");
        Ok(true)
    }

    async fn list_posts(&self, filter: &ListFilter) -> Result<Vec<Post>, DomainError> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE deleted_at IS NULL"
        ));
        push_search(&mut query, filter);
        push_order(&mut query, filter);
        query
            .push(" LIMIT ")
            .push_bind(i64::from(filter.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(filter.offset));

        let rows = query
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|err| DomainError::unexpected("list posts", err))?;

        let mut tags = self.load_tags(rows.iter().map(|row| row.id).collect()).await?;
        rows.into_iter()
            .map(|row| {
                let post_tags = tags.remove(&row.id).unwrap_or_default();
                map_row_to_post(row, post_tags)
            })
            .collect()
    }

    async fn count_filtered(&self, filter: &ListFilter) -> Result<i64, DomainError> {
        let mut query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts WHERE deleted_at IS NULL");
        push_search(&mut query, filter);

        query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|err| DomainError::unexpected("count filtered posts", err))
    }

    async fn count_all(&self) -> Result<i64, DomainError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| DomainError::unexpected("count posts", err))
    }
}

fn push_search(query: &mut QueryBuilder<'_, Postgres>, filter: &ListFilter) {
    if let Some(pattern) = filter.search_pattern() {
        query
            .push(" AND (LOWER(name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(description) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

// Only allow-listed identifiers reach the SQL text.
fn push_order(query: &mut QueryBuilder<'_, Postgres>, filter: &ListFilter) {
    let keyword = filter.order.keyword();
    query
        .push(" ORDER BY ")
        .push(filter.sort.column())
        .push(" ")
        .push(keyword);
    if filter.sort != SortField::Id {
        query.push(", id ").push(keyword);
    }
}

async fn begin(pool: &PgPool) -> Result<Transaction<'static, Postgres>, DomainError> {
    pool.begin()
        .await
        .map_err(|err| DomainError::unexpected("begin transaction", err))
}

async fn commit(tx: Transaction<'_, Postgres>) -> Result<(), DomainError> {
    tx.commit()
        .await
        .map_err(|err| DomainError::unexpected("commit transaction", err))
}

async fn insert_tags(
    tx: &mut Transaction<'_, Postgres>,
    post_id: i64,
    tags: &[NewTag],
) -> Result<Vec<TagRow>, DomainError> {
    let mut rows = Vec::with_capacity(tags.len());
    for tag in tags {
        let row = sqlx::query_as::<_, TagRow>(&format!(
            "INSERT INTO tags (post_id, name, description) VALUES ($1, $2, $3) RETURNING {TAG_COLUMNS}"
        ))
        .bind(post_id)
        .bind(&tag.name)
        .bind(&tag.description)
        .fetch_one(&mut **tx)
        .await
        .map_err(|err| DomainError::unexpected("insert tag", err))?;
        rows.push(row);
    }
    Ok(rows)
}

fn map_row_to_post(row: PostRow, tags: Vec<TagRow>) -> Result<Post, DomainError> {
    let tags = tags
        .into_iter()
        .map(|tag| Tag {
            id: tag.id,
            post_id: tag.post_id,
            name: tag.name,
            description: tag.description,
            created_at: tag.created_at,
            updated_at: tag.updated_at,
        })
        .collect();

    Post::new(
        row.id,
        row.name,
        row.description,
        tags,
        row.created_at,
        row.updated_at,
    )
    .map_err(|err| DomainError::unexpected("post row", err))
}
