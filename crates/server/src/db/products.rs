//! Saved product repository.

use async_trait::async_trait;
use sqlx::PgPool;

use marketlink_core::{MarketplaceProduct, ProductId, SavedProduct, StoreId, UserId};

use super::{ProductRepository, RepositoryError};

/// Internal row type for `PostgreSQL` product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    store_id: i32,
    external_id: String,
    name: String,
    price: i64,
    quantity: i64,
}

impl TryFrom<ProductRow> for SavedProduct {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        if row.price < 0 || row.quantity < 0 {
            return Err(RepositoryError::DataCorruption(format!(
                "product {} has negative price or quantity",
                row.id
            )));
        }

        Ok(Self {
            id: ProductId::new(row.id),
            store_id: StoreId::new(row.store_id),
            external_id: row.external_id,
            name: row.name,
            price: row.price,
            quantity: row.quantity,
        })
    }
}

/// `PostgreSQL` saved product repository.
#[derive(Debug, Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn upsert(
        &self,
        store_id: StoreId,
        product: &MarketplaceProduct,
    ) -> Result<SavedProduct, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO products (store_id, external_id, name, price, quantity)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (store_id, external_id) DO UPDATE
            SET name = EXCLUDED.name,
                price = EXCLUDED.price,
                quantity = EXCLUDED.quantity,
                updated_at = NOW()
            RETURNING id, store_id, external_id, name, price, quantity
            ",
        )
        .bind(store_id)
        .bind(&product.external_id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.quantity)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get_by_id(&self, id: ProductId) -> Result<Option<SavedProduct>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, store_id, external_id, name, price, quantity
            FROM products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_by_stores(
        &self,
        store_ids: &[StoreId],
    ) -> Result<Vec<SavedProduct>, RepositoryError> {
        if store_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = store_ids.iter().map(StoreId::as_i32).collect();
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, store_id, external_id, name, price, quantity
            FROM products
            WHERE store_id = ANY($1)
            ORDER BY store_id, id
            ",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn delete_owned(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM products p
            USING stores s
            WHERE p.id = $1 AND p.store_id = s.id AND s.user_id = $2
            ",
        )
        .bind(product_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
