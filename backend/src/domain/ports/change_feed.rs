//! Port for catalogue change notifications.
//!
//! Consumers treat every notification as "something changed, refetch"; the
//! payload is informational only.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::ProductId;

/// What happened to the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogueChangeKind {
    Inserted,
    Updated,
    Deleted,
    Imported,
}

/// A single catalogue change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueChange {
    pub kind: CatalogueChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
}

impl CatalogueChange {
    /// Notification for a single product.
    pub fn product(kind: CatalogueChangeKind, id: ProductId) -> Self {
        Self {
            kind,
            product_id: Some(id),
        }
    }

    /// Notification for a bulk import.
    pub fn imported() -> Self {
        Self {
            kind: CatalogueChangeKind::Imported,
            product_id: None,
        }
    }
}

/// Publish/subscribe seam for product table changes.
#[cfg_attr(test, mockall::automock)]
pub trait ChangeFeed: Send + Sync {
    /// Notify current subscribers. Having no subscribers is not an error.
    fn publish(&self, change: CatalogueChange);

    /// Receive changes published after this call.
    fn subscribe(&self) -> broadcast::Receiver<CatalogueChange>;
}

/// Fixture feed that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureChangeFeed;

impl ChangeFeed for FixtureChangeFeed {
    fn publish(&self, _change: CatalogueChange) {}

    fn subscribe(&self) -> broadcast::Receiver<CatalogueChange> {
        let (_sender, receiver) = broadcast::channel(1);
        receiver
    }
}
