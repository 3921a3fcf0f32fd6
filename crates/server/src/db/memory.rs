//! In-memory repositories for tests.
//!
//! [`MemoryDatabase`] implements every repository trait over one shared set
//! of tables and mirrors the Postgres schema's constraints: unique emails,
//! `(store_id, external_id)` upserts, the unordered mapping pair index, the
//! self-mapping check and the delete cascades.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use marketlink_core::{
    Email, MappingId, MarketplaceProduct, ProductId, ProductMapping, SavedProduct, Store, StoreId,
    StoreType, UserId, canonical_pair,
};

use super::{
    MappingRepository, ProductRepository, RepositoryError, StoreRepository, User, UserRepository,
};

#[derive(Debug, Clone)]
struct StoreRecord {
    store: Store,
    encrypted_token: String,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i32,
    users: BTreeMap<UserId, User>,
    stores: BTreeMap<StoreId, StoreRecord>,
    products: BTreeMap<ProductId, SavedProduct>,
    mappings: BTreeMap<MappingId, ProductMapping>,
}

impl Tables {
    const fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn delete_product_cascade(&mut self, product_id: ProductId) {
        self.products.remove(&product_id);
        self.mappings
            .retain(|_, m| m.product1_id != product_id && m.product2_id != product_id);
    }
}

/// Shared in-memory tables. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a store row with an arbitrary stored token and type code.
    ///
    /// Lets tests plant rows the service layer would never write, such as a
    /// corrupt ciphertext or a provider this build does not know.
    pub fn insert_raw_store(&self, user_id: UserId, store_type: &str, stored_token: &str) -> Store {
        let mut tables = self.lock();
        let store = Store {
            id: StoreId::new(tables.next_id()),
            user_id,
            store_type: store_type.to_string(),
            created_at: Utc::now(),
        };
        tables.stores.insert(
            store.id,
            StoreRecord {
                store: store.clone(),
                encrypted_token: stored_token.to_string(),
            },
        );
        store
    }

    /// Remove a product row directly, as an out-of-band delete would.
    pub fn remove_product_row(&self, product_id: ProductId) {
        self.lock().products.remove(&product_id);
    }
}

#[async_trait]
impl UserRepository for MemoryDatabase {
    async fn create(&self, email: &Email, password_hash: &str) -> Result<User, RepositoryError> {
        let mut tables = self.lock();
        if tables.users.values().any(|u| &u.email == email) {
            return Err(RepositoryError::Conflict(
                "email already registered".to_string(),
            ));
        }

        let user = User {
            id: UserId::new(tables.next_id()),
            email: email.clone(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }
}

#[async_trait]
impl StoreRepository for MemoryDatabase {
    async fn create(
        &self,
        user_id: UserId,
        store_type: StoreType,
        encrypted_token: &str,
    ) -> Result<Store, RepositoryError> {
        Ok(self.insert_raw_store(user_id, store_type.code(), encrypted_token))
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Store>, RepositoryError> {
        Ok(self
            .lock()
            .stores
            .values()
            .filter(|r| r.store.user_id == user_id)
            .map(|r| r.store.clone())
            .collect())
    }

    async fn get_encrypted_token(
        &self,
        store_id: StoreId,
        user_id: UserId,
    ) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .lock()
            .stores
            .get(&store_id)
            .filter(|r| r.store.user_id == user_id)
            .map(|r| r.encrypted_token.clone()))
    }

    async fn get_owner(&self, store_id: StoreId) -> Result<Option<UserId>, RepositoryError> {
        Ok(self.lock().stores.get(&store_id).map(|r| r.store.user_id))
    }

    async fn delete(&self, store_id: StoreId, user_id: UserId) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        let owned = tables
            .stores
            .get(&store_id)
            .is_some_and(|r| r.store.user_id == user_id);
        if !owned {
            return Ok(false);
        }

        tables.stores.remove(&store_id);
        let orphaned: Vec<ProductId> = tables
            .products
            .values()
            .filter(|p| p.store_id == store_id)
            .map(|p| p.id)
            .collect();
        for product_id in orphaned {
            tables.delete_product_cascade(product_id);
        }
        Ok(true)
    }
}

#[async_trait]
impl ProductRepository for MemoryDatabase {
    async fn upsert(
        &self,
        store_id: StoreId,
        product: &MarketplaceProduct,
    ) -> Result<SavedProduct, RepositoryError> {
        let mut tables = self.lock();
        if !tables.stores.contains_key(&store_id) {
            return Err(RepositoryError::NotFound);
        }

        if let Some(existing) = tables
            .products
            .values_mut()
            .find(|p| p.store_id == store_id && p.external_id == product.external_id)
        {
            existing.name.clone_from(&product.name);
            existing.price = product.price;
            existing.quantity = product.quantity;
            return Ok(existing.clone());
        }

        let saved = SavedProduct {
            id: ProductId::new(tables.next_id()),
            store_id,
            external_id: product.external_id.clone(),
            name: product.name.clone(),
            price: product.price,
            quantity: product.quantity,
        };
        tables.products.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn get_by_id(&self, id: ProductId) -> Result<Option<SavedProduct>, RepositoryError> {
        Ok(self.lock().products.get(&id).cloned())
    }

    async fn list_by_stores(
        &self,
        store_ids: &[StoreId],
    ) -> Result<Vec<SavedProduct>, RepositoryError> {
        let mut products: Vec<SavedProduct> = self
            .lock()
            .products
            .values()
            .filter(|p| store_ids.contains(&p.store_id))
            .cloned()
            .collect();
        products.sort_by_key(|p| (p.store_id, p.id));
        Ok(products)
    }

    async fn delete_owned(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        let owned = tables
            .products
            .get(&product_id)
            .and_then(|p| tables.stores.get(&p.store_id))
            .is_some_and(|r| r.store.user_id == user_id);
        if owned {
            tables.delete_product_cascade(product_id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl MappingRepository for MemoryDatabase {
    async fn create(
        &self,
        product1_id: ProductId,
        product2_id: ProductId,
        user_id: UserId,
    ) -> Result<ProductMapping, RepositoryError> {
        let mut tables = self.lock();
        if product1_id == product2_id {
            return Err(RepositoryError::Conflict(
                "product_mappings_distinct".to_string(),
            ));
        }
        let pair = canonical_pair(product1_id, product2_id);
        if tables.mappings.values().any(|m| m.canonical_pair() == pair) {
            return Err(RepositoryError::Conflict(
                "mapping between these products already exists".to_string(),
            ));
        }

        let mapping = ProductMapping {
            id: MappingId::new(tables.next_id()),
            product1_id,
            product2_id,
            user_id,
            created_at: Utc::now(),
        };
        tables.mappings.insert(mapping.id, mapping.clone());
        Ok(mapping)
    }

    async fn pair_exists(&self, a: ProductId, b: ProductId) -> Result<bool, RepositoryError> {
        let pair = canonical_pair(a, b);
        Ok(self
            .lock()
            .mappings
            .values()
            .any(|m| m.canonical_pair() == pair))
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<ProductMapping>, RepositoryError> {
        let mut mappings: Vec<ProductMapping> = self
            .lock()
            .mappings
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        mappings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(mappings)
    }

    async fn delete(
        &self,
        mapping_id: MappingId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        let owned = tables
            .mappings
            .get(&mapping_id)
            .is_some_and(|m| m.user_id == user_id);
        if owned {
            tables.mappings.remove(&mapping_id);
        }
        Ok(owned)
    }
}
