//! In-memory product store for local development and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use tokio::sync::RwLock;

use crate::domain::ports::{ProductRepository, ProductRepositoryError};
use crate::domain::{Product, ProductDraft, ProductId, UserId};

#[derive(Default)]
struct Table {
    rows: HashMap<ProductId, Product>,
    by_code: HashMap<String, ProductId>,
}

impl Table {
    fn code_taken_by_other(&self, code: &str, id: Option<&ProductId>) -> bool {
        self.by_code
            .get(code)
            .is_some_and(|owner| Some(owner) != id)
    }

    fn store(&mut self, product: Product) -> Product {
        self.by_code
            .insert(product.new_code().to_owned(), product.id);
        self.rows.insert(product.id, product.clone());
        product
    }
}

/// [`ProductRepository`] holding rows in a process-local map.
///
/// Enforces the unique `new_code` constraint the hosted store does, and makes
/// batch inserts all-or-nothing.
pub struct InMemoryProductRepository {
    table: RwLock<Table>,
    clock: Arc<dyn Clock>,
}

impl InMemoryProductRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            table: RwLock::new(Table::default()),
            clock,
        }
    }

    /// Number of stored products.
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }
}

impl Default for InMemoryProductRepository {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn list(&self) -> Result<Vec<Product>, ProductRepositoryError> {
        let table = self.table.read().await;
        let mut products: Vec<Product> = table.rows.values().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, ProductRepositoryError> {
        Ok(self.table.read().await.rows.get(id).cloned())
    }

    async fn insert(
        &self,
        draft: &ProductDraft,
        created_by: Option<UserId>,
    ) -> Result<Product, ProductRepositoryError> {
        let mut table = self.table.write().await;
        if table.code_taken_by_other(&draft.new_code, None) {
            return Err(ProductRepositoryError::duplicate_code(
                draft.new_code.clone(),
            ));
        }
        let product = Product::from_draft(
            ProductId::random(),
            draft.clone(),
            created_by,
            self.clock.utc(),
        );
        Ok(table.store(product))
    }

    async fn insert_batch(
        &self,
        drafts: &[ProductDraft],
        created_by: Option<UserId>,
    ) -> Result<usize, ProductRepositoryError> {
        let mut table = self.table.write().await;
        let mut seen = std::collections::HashSet::new();
        for draft in drafts {
            if table.code_taken_by_other(&draft.new_code, None)
                || !seen.insert(draft.new_code.as_str())
            {
                return Err(ProductRepositoryError::query(format!(
                    "batch rejected: duplicate new code {}",
                    draft.new_code
                )));
            }
        }
        let now = self.clock.utc();
        for draft in drafts {
            table.store(Product::from_draft(
                ProductId::random(),
                draft.clone(),
                created_by,
                now,
            ));
        }
        Ok(drafts.len())
    }

    async fn upsert_by_code(
        &self,
        draft: &ProductDraft,
        created_by: Option<UserId>,
    ) -> Result<Product, ProductRepositoryError> {
        let mut table = self.table.write().await;
        let now = self.clock.utc();
        let existing = table
            .by_code
            .get(&draft.new_code)
            .and_then(|id| table.rows.get(id))
            .cloned();
        let product = match existing {
            Some(current) => Product {
                fields: draft.clone(),
                updated_at: now,
                ..current
            },
            None => Product::from_draft(ProductId::random(), draft.clone(), created_by, now),
        };
        Ok(table.store(product))
    }

    async fn update(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, ProductRepositoryError> {
        let mut table = self.table.write().await;
        let current = table
            .rows
            .get(id)
            .cloned()
            .ok_or_else(|| ProductRepositoryError::not_found(id.to_string()))?;
        if table.code_taken_by_other(&draft.new_code, Some(id)) {
            return Err(ProductRepositoryError::duplicate_code(
                draft.new_code.clone(),
            ));
        }
        if current.new_code() != draft.new_code {
            table.by_code.remove(current.new_code());
        }
        let product = Product {
            fields: draft.clone(),
            updated_at: self.clock.utc(),
            ..current
        };
        Ok(table.store(product))
    }

    async fn delete(&self, id: &ProductId) -> Result<(), ProductRepositoryError> {
        let mut table = self.table.write().await;
        let removed = table
            .rows
            .remove(id)
            .ok_or_else(|| ProductRepositoryError::not_found(id.to_string()))?;
        table.by_code.remove(removed.new_code());
        Ok(())
    }
}
