//! Store repository.
//!
//! Every read and delete that touches a token is scoped by both `id` and
//! `user_id`, so a store id belonging to someone else behaves exactly like a
//! missing one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use marketlink_core::{Store, StoreId, StoreType, UserId};

use super::{RepositoryError, StoreRepository};

/// Internal row type for `PostgreSQL` store queries.
#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: i32,
    user_id: i32,
    store_type: String,
    created_at: DateTime<Utc>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Self {
            id: StoreId::new(row.id),
            user_id: UserId::new(row.user_id),
            store_type: row.store_type,
            created_at: row.created_at,
        }
    }
}

/// `PostgreSQL` store repository.
#[derive(Debug, Clone)]
pub struct PgStoreRepository {
    pool: PgPool,
}

impl PgStoreRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreRepository for PgStoreRepository {
    async fn create(
        &self,
        user_id: UserId,
        store_type: StoreType,
        encrypted_token: &str,
    ) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            r"
            INSERT INTO stores (user_id, store_type, encrypted_api_token)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, store_type, created_at
            ",
        )
        .bind(user_id)
        .bind(store_type.code())
        .bind(encrypted_token)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(
            r"
            SELECT id, user_id, store_type, created_at
            FROM stores
            WHERE user_id = $1
            ORDER BY id
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_encrypted_token(
        &self,
        store_id: StoreId,
        user_id: UserId,
    ) -> Result<Option<String>, RepositoryError> {
        let token = sqlx::query_scalar::<_, String>(
            "SELECT encrypted_api_token FROM stores WHERE id = $1 AND user_id = $2",
        )
        .bind(store_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn get_owner(&self, store_id: StoreId) -> Result<Option<UserId>, RepositoryError> {
        let owner = sqlx::query_scalar::<_, UserId>("SELECT user_id FROM stores WHERE id = $1")
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(owner)
    }

    async fn delete(&self, store_id: StoreId, user_id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM stores WHERE id = $1 AND user_id = $2")
            .bind(store_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
