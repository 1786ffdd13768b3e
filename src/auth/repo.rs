use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::repo_types::{NewRefreshToken, NewUser, RefreshToken, User, UserChanges};
use crate::db::{PgStore, StoreResult};

/// Persistence for users and refresh tokens. Every method is a single-row,
/// atomic operation; uniqueness is the store's job.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Fails with `StoreError::Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    /// Returns `None` when no user has this id.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>>;

    async fn find_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshToken>>;

    async fn create_refresh_token(&self, token: NewRefreshToken) -> StoreResult<RefreshToken>;

    /// Returns whether a row was removed. Two concurrent deletes of the same
    /// token see `true` exactly once.
    async fn delete_refresh_token(&self, token: &str) -> StoreResult<bool>;
}

const USER_COLUMNS: &str = "id, email, password_hash, display_name, created_at, updated_at";

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, display_name)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.display_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET email         = COALESCE($2, email),
                   display_name  = COALESCE($3, display_name),
                   password_hash = COALESCE($4, password_hash),
                   updated_at    = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.email)
        .bind(changes.display_name)
        .bind(changes.password_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT token, user_id, expires_at, created_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_refresh_token(&self, token: NewRefreshToken) -> StoreResult<RefreshToken> {
        let row = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (token, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING token, user_id, expires_at, created_at
            "#,
        )
        .bind(token.token)
        .bind(token.user_id)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_refresh_token(&self, token: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
