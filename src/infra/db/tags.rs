use async_trait::async_trait;

use crate::application::repos::{RepoError, TagsRepo};

use super::{
    PostgresRepositories,
    util::{to_sql_bound, with_reconnect},
};

const TOP_TAGS_SQL: &str = "SELECT t.name \
    FROM post_tags pt \
    INNER JOIN tags t ON t.tag_id = pt.tag_id \
    GROUP BY t.name \
    ORDER BY COUNT(DISTINCT pt.post_id) DESC, t.name \
    LIMIT $1";

const TAGS_FOR_POST_SQL: &str = "SELECT t.name \
    FROM post_tags pt \
    INNER JOIN tags t ON t.tag_id = pt.tag_id \
    WHERE pt.post_id = $1 \
    ORDER BY t.name";

#[derive(sqlx::FromRow)]
struct TagNameRow {
    name: String,
}

#[async_trait]
impl TagsRepo for PostgresRepositories {
    async fn top_tags(&self, limit: u64) -> Result<Vec<String>, RepoError> {
        let limit = to_sql_bound(limit);
        let rows = with_reconnect("tags.top", || {
            sqlx::query_as::<_, TagNameRow>(TOP_TAGS_SQL)
                .bind(limit)
                .fetch_all(self.pool())
        })
        .await?;

        Ok(rows.into_iter().map(|row| row.name).collect())
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<String>, RepoError> {
        let rows = with_reconnect("tags.list_for_post", || {
            sqlx::query_as::<_, TagNameRow>(TAGS_FOR_POST_SQL)
                .bind(post_id)
                .fetch_all(self.pool())
        })
        .await?;

        Ok(rows.into_iter().map(|row| row.name).collect())
    }
}
