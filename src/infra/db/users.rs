use async_trait::async_trait;

use crate::application::repos::{RepoError, UsersRepo};

use super::{PostgresRepositories, util::with_reconnect};

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn find_name(&self, user_id: i64) -> Result<Option<String>, RepoError> {
        with_reconnect("users.find_name", || {
            sqlx::query_scalar::<_, String>("SELECT name FROM users WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(self.pool())
        })
        .await
    }
}
