//! Product mapping repository.
//!
//! The `product_mappings_unordered_pair_idx` index is the final guard against
//! two concurrent creators inserting `(a, b)` and `(b, a)`; the service-level
//! pre-check only produces a friendlier error in the common case.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use marketlink_core::{MappingId, ProductId, ProductMapping, UserId};

use super::{MappingRepository, RepositoryError, conflict_or_database};

/// Internal row type for `PostgreSQL` mapping queries.
#[derive(Debug, sqlx::FromRow)]
struct MappingRow {
    id: i32,
    product1_id: i32,
    product2_id: i32,
    user_id: i32,
    created_at: DateTime<Utc>,
}

impl From<MappingRow> for ProductMapping {
    fn from(row: MappingRow) -> Self {
        Self {
            id: MappingId::new(row.id),
            product1_id: ProductId::new(row.product1_id),
            product2_id: ProductId::new(row.product2_id),
            user_id: UserId::new(row.user_id),
            created_at: row.created_at,
        }
    }
}

/// `PostgreSQL` mapping repository.
#[derive(Debug, Clone)]
pub struct PgMappingRepository {
    pool: PgPool,
}

impl PgMappingRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MappingRepository for PgMappingRepository {
    async fn create(
        &self,
        product1_id: ProductId,
        product2_id: ProductId,
        user_id: UserId,
    ) -> Result<ProductMapping, RepositoryError> {
        let row = sqlx::query_as::<_, MappingRow>(
            r"
            INSERT INTO product_mappings (product1_id, product2_id, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, product1_id, product2_id, user_id, created_at
            ",
        )
        .bind(product1_id)
        .bind(product2_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "mapping between these products already exists"))?;

        Ok(row.into())
    }

    async fn pair_exists(&self, a: ProductId, b: ProductId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM product_mappings
                WHERE LEAST(product1_id, product2_id) = LEAST($1, $2)
                  AND GREATEST(product1_id, product2_id) = GREATEST($1, $2)
            )
            ",
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<ProductMapping>, RepositoryError> {
        let rows = sqlx::query_as::<_, MappingRow>(
            r"
            SELECT id, product1_id, product2_id, user_id, created_at
            FROM product_mappings
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete(
        &self,
        mapping_id: MappingId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM product_mappings WHERE id = $1 AND user_id = $2")
            .bind(mapping_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
