use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{PostsRepo, RepoError, TagFilter},
    domain::{
        entities::{ListingRecord, PostRecord},
        posts::{PostKey, PostSummary},
    },
};

use super::{
    PostgresRepositories,
    util::{from_sql_count, to_sql_bound, with_reconnect},
};

const LIST_INDEX_SQL: &str = "SELECT filename, \
        COALESCE(title, '') AS title, \
        COALESCE(description, '') AS description, \
        COALESCE(image, '') AS image, \
        published, \
        COALESCE(modified, published) AS modified \
    FROM posts \
    WHERE filename IS NOT NULL AND published IS NOT NULL \
    ORDER BY filename DESC";

const COUNT_SQL: &str =
    "SELECT COUNT(*) FROM posts WHERE filename IS NOT NULL AND published IS NOT NULL";

const COUNT_TAGGED_SQL: &str = "SELECT COUNT(DISTINCT pt.post_id) \
    FROM post_tags pt \
    INNER JOIN tags t ON t.tag_id = pt.tag_id \
    INNER JOIN posts p ON p.post_id = pt.post_id \
    WHERE LOWER(t.name) LIKE $1 ESCAPE '\\' \
        AND p.filename IS NOT NULL AND p.published IS NOT NULL";

const LIST_PAGE_COLUMNS: &str = "SELECT u.name AS author, \
        p.filename, \
        COALESCE(p.title, '') AS title, \
        COALESCE(p.description, '') AS description, \
        COALESCE(p.preview, '') AS preview, \
        COALESCE(p.image, '') AS image, \
        p.published, \
        COALESCE(p.modified, p.published) AS modified \
    FROM posts p \
    INNER JOIN users u ON u.user_id = p.user_id \
    WHERE p.filename IS NOT NULL AND p.published IS NOT NULL";

const TAGGED_POSTS_CLAUSE: &str = " AND p.post_id IN (\
        SELECT pt.post_id FROM post_tags pt \
        INNER JOIN tags t ON t.tag_id = pt.tag_id \
        WHERE LOWER(t.name) LIKE $3 ESCAPE '\\')";

const LIST_PAGE_ORDER: &str = " ORDER BY p.filename DESC LIMIT $1 OFFSET $2";

const FIND_BY_KEY_SQL: &str = "SELECT post_id, user_id, filename, \
        COALESCE(title, '') AS title, \
        COALESCE(description, '') AS description, \
        COALESCE(preview, '') AS preview, \
        COALESCE(content, '') AS content, \
        COALESCE(image, '') AS image, \
        published, \
        COALESCE(modified, published) AS modified \
    FROM posts \
    WHERE filename = $1 AND published IS NOT NULL";

#[derive(sqlx::FromRow)]
struct IndexRow {
    filename: String,
    title: String,
    description: String,
    image: String,
    published: OffsetDateTime,
    modified: OffsetDateTime,
}

impl From<IndexRow> for PostSummary {
    fn from(row: IndexRow) -> Self {
        Self {
            key: PostKey::from_stored(row.filename),
            title: row.title,
            description: row.description,
            image_alt: row.image,
            published: row.published,
            modified: row.modified,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ListingRow {
    author: String,
    filename: String,
    title: String,
    description: String,
    preview: String,
    image: String,
    published: OffsetDateTime,
    modified: OffsetDateTime,
}

impl From<ListingRow> for ListingRecord {
    fn from(row: ListingRow) -> Self {
        Self {
            key: PostKey::from_stored(row.filename),
            author: row.author,
            title: row.title,
            description: row.description,
            preview: row.preview,
            image_alt: row.image,
            published: row.published,
            modified: row.modified,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    post_id: i64,
    user_id: i64,
    filename: String,
    title: String,
    description: String,
    preview: String,
    content: String,
    image: String,
    published: OffsetDateTime,
    modified: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.post_id,
            user_id: row.user_id,
            key: PostKey::from_stored(row.filename),
            title: row.title,
            description: row.description,
            preview: row.preview,
            content_markdown: row.content,
            image_alt: row.image,
            published: row.published,
            modified: row.modified,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_index(&self) -> Result<Vec<PostSummary>, RepoError> {
        let rows = with_reconnect("posts.list_index", || {
            sqlx::query_as::<_, IndexRow>(LIST_INDEX_SQL).fetch_all(self.pool())
        })
        .await?;

        Ok(rows.into_iter().map(PostSummary::from).collect())
    }

    async fn count_posts(&self) -> Result<u64, RepoError> {
        let count: i64 = with_reconnect("posts.count", || {
            sqlx::query_scalar::<_, i64>(COUNT_SQL).fetch_one(self.pool())
        })
        .await?;

        from_sql_count(count)
    }

    async fn count_tagged(&self, filter: &TagFilter) -> Result<u64, RepoError> {
        let count: i64 = with_reconnect("posts.count_tagged", || {
            sqlx::query_scalar::<_, i64>(COUNT_TAGGED_SQL)
                .bind(filter.like_pattern())
                .fetch_one(self.pool())
        })
        .await?;

        from_sql_count(count)
    }

    async fn list_page(
        &self,
        filter: Option<&TagFilter>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<ListingRecord>, RepoError> {
        let sql = match filter {
            Some(_) => format!("{LIST_PAGE_COLUMNS}{TAGGED_POSTS_CLAUSE}{LIST_PAGE_ORDER}"),
            None => format!("{LIST_PAGE_COLUMNS}{LIST_PAGE_ORDER}"),
        };
        let limit = to_sql_bound(limit);
        let offset = to_sql_bound(offset);

        let rows = with_reconnect("posts.list_page", || {
            let mut statement = sqlx::query_as::<_, ListingRow>(&sql).bind(limit).bind(offset);
            if let Some(filter) = filter {
                statement = statement.bind(filter.like_pattern());
            }
            statement.fetch_all(self.pool())
        })
        .await?;

        Ok(rows.into_iter().map(ListingRecord::from).collect())
    }

    async fn find_by_key(&self, key: &PostKey) -> Result<Option<PostRecord>, RepoError> {
        let row = with_reconnect("posts.find_by_key", || {
            sqlx::query_as::<_, PostRow>(FIND_BY_KEY_SQL)
                .bind(key.as_str())
                .fetch_optional(self.pool())
        })
        .await?;

        Ok(row.map(PostRecord::from))
    }
}
