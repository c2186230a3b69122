//! Port for catalogue persistence.
//!
//! Adapters store products keyed by id with `new_code` as a unique secondary
//! key. Lookups report "no rows" as `Ok(None)` so callers can tell a missing
//! product apart from a failing store.

use async_trait::async_trait;

use crate::domain::{Product, ProductDraft, ProductId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by product repository adapters.
    pub enum ProductRepositoryError {
        /// Repository connection could not be established.
        Connection { message } =>
            "product repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message } =>
            "product repository query failed: {message}",
        /// The targeted product does not exist.
        NotFound { id } => "product {id} not found",
        /// Another product already uses this new code.
        DuplicateCode { new_code } =>
            "product code {new_code} already exists",
    }
}

/// Port for product storage and retrieval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// All products ordered by creation time, newest first.
    async fn list(&self) -> Result<Vec<Product>, ProductRepositoryError>;

    /// Fetch a single product.
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, ProductRepositoryError>;

    /// Insert one product, failing with
    /// [`ProductRepositoryError::DuplicateCode`] when the code is taken.
    async fn insert(
        &self,
        draft: &ProductDraft,
        created_by: Option<UserId>,
    ) -> Result<Product, ProductRepositoryError>;

    /// Insert a batch in a single call and return the number stored.
    async fn insert_batch(
        &self,
        drafts: &[ProductDraft],
        created_by: Option<UserId>,
    ) -> Result<usize, ProductRepositoryError>;

    /// Insert or merge a product keyed on its new code.
    async fn upsert_by_code(
        &self,
        draft: &ProductDraft,
        created_by: Option<UserId>,
    ) -> Result<Product, ProductRepositoryError>;

    /// Replace the editable fields of an existing product.
    async fn update(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, ProductRepositoryError>;

    /// Remove a product.
    async fn delete(&self, id: &ProductId) -> Result<(), ProductRepositoryError>;
}

/// Fixture implementation holding an empty catalogue.
///
/// Writes succeed without storing anything; use it where catalogue contents
/// are not under test.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureProductRepository;

#[async_trait]
impl ProductRepository for FixtureProductRepository {
    async fn list(&self) -> Result<Vec<Product>, ProductRepositoryError> {
        Ok(Vec::new())
    }

    async fn find_by_id(
        &self,
        _id: &ProductId,
    ) -> Result<Option<Product>, ProductRepositoryError> {
        Ok(None)
    }

    async fn insert(
        &self,
        draft: &ProductDraft,
        created_by: Option<UserId>,
    ) -> Result<Product, ProductRepositoryError> {
        Ok(Product::from_draft(
            ProductId::random(),
            draft.clone(),
            created_by,
            chrono::Utc::now(),
        ))
    }

    async fn insert_batch(
        &self,
        drafts: &[ProductDraft],
        _created_by: Option<UserId>,
    ) -> Result<usize, ProductRepositoryError> {
        Ok(drafts.len())
    }

    async fn upsert_by_code(
        &self,
        draft: &ProductDraft,
        created_by: Option<UserId>,
    ) -> Result<Product, ProductRepositoryError> {
        self.insert(draft, created_by).await
    }

    async fn update(
        &self,
        id: &ProductId,
        _draft: &ProductDraft,
    ) -> Result<Product, ProductRepositoryError> {
        Err(ProductRepositoryError::not_found(id.to_string()))
    }

    async fn delete(&self, id: &ProductId) -> Result<(), ProductRepositoryError> {
        Err(ProductRepositoryError::not_found(id.to_string()))
    }
}
