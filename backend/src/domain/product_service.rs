//! Product administration: lookup, create, update and delete.
//!
//! Mutations are admin only. Each one appends a best-effort audit entry and
//! publishes a catalogue change so caches refetch.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::domain::audit::{AuditAction, AuditTrail, NewAuditEntry};
use crate::domain::ports::{
    CatalogueChange, CatalogueChangeKind, ChangeFeed, ProductRepository, ProductRepositoryError,
};
use crate::domain::{Actor, Error, Product, ProductDraft, ProductId};

const TABLE: &str = "products";

/// Map product store failures onto domain errors.
pub(crate) fn map_product_error(error: ProductRepositoryError) -> Error {
    match error {
        ProductRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("product repository unavailable: {message}"))
        }
        ProductRepositoryError::Query { message } => {
            Error::internal(format!("product repository error: {message}"))
        }
        ProductRepositoryError::NotFound { id } => {
            Error::not_found(format!("product {id} not found"))
        }
        ProductRepositoryError::DuplicateCode { new_code } => {
            Error::conflict(format!("product code {new_code} already exists"))
                .with_details(json!({ "field": "newCode", "code": "duplicate_code" }))
        }
    }
}

fn validated(draft: ProductDraft) -> Result<ProductDraft, Error> {
    let draft = draft.normalised();
    draft.validate().map_err(|err| {
        Error::invalid_request(err.to_string()).with_details(json!({ "field": err.field() }))
    })?;
    Ok(draft)
}

/// Product administration service.
#[derive(Clone)]
pub struct ProductService {
    products: Arc<dyn ProductRepository>,
    audit: AuditTrail,
    changes: Arc<dyn ChangeFeed>,
}

impl ProductService {
    /// Create the service.
    pub fn new(
        products: Arc<dyn ProductRepository>,
        audit: AuditTrail,
        changes: Arc<dyn ChangeFeed>,
    ) -> Self {
        Self {
            products,
            audit,
            changes,
        }
    }

    /// Fetch one product for any approved user.
    pub async fn get(&self, actor: &Actor, id: &ProductId) -> Result<Product, Error> {
        actor.require_browse()?;
        self.products
            .find_by_id(id)
            .await
            .map_err(map_product_error)?
            .ok_or_else(|| Error::not_found(format!("product {id} not found")))
    }

    /// Create a product with a unique new code.
    pub async fn create(&self, actor: &Actor, draft: ProductDraft) -> Result<Product, Error> {
        actor.require_admin()?;
        let draft = validated(draft)?;
        let product = self
            .products
            .insert(&draft, Some(actor.user_id))
            .await
            .map_err(map_product_error)?;

        let snapshot = serde_json::to_value(&product).unwrap_or_else(|_| json!({}));
        self.audit
            .record(NewAuditEntry::new(
                actor.user_id,
                AuditAction::Create,
                TABLE,
                Some(product.id.to_string()),
                snapshot,
            ))
            .await;
        self.changes.publish(CatalogueChange::product(
            CatalogueChangeKind::Inserted,
            product.id,
        ));
        info!(product_id = %product.id, new_code = product.new_code(), "product created");
        Ok(product)
    }

    /// Replace a product's editable fields.
    pub async fn update(
        &self,
        actor: &Actor,
        id: &ProductId,
        draft: ProductDraft,
    ) -> Result<Product, Error> {
        actor.require_admin()?;
        let draft = validated(draft)?;
        let product = self
            .products
            .update(id, &draft)
            .await
            .map_err(map_product_error)?;

        let changes = serde_json::to_value(&draft).unwrap_or_else(|_| json!({}));
        self.audit
            .record(NewAuditEntry::new(
                actor.user_id,
                AuditAction::Update,
                TABLE,
                Some(id.to_string()),
                changes,
            ))
            .await;
        self.changes
            .publish(CatalogueChange::product(CatalogueChangeKind::Updated, *id));
        info!(product_id = %id, "product updated");
        Ok(product)
    }

    /// Remove a product.
    pub async fn delete(&self, actor: &Actor, id: &ProductId) -> Result<(), Error> {
        actor.require_admin()?;
        self.products
            .delete(id)
            .await
            .map_err(map_product_error)?;

        self.audit
            .record(NewAuditEntry::new(
                actor.user_id,
                AuditAction::Delete,
                TABLE,
                Some(id.to_string()),
                json!({ "id": id }),
            ))
            .await;
        self.changes
            .publish(CatalogueChange::product(CatalogueChangeKind::Deleted, *id));
        info!(product_id = %id, "product deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "product_service_tests.rs"]
mod tests;
