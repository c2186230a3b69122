//! Catalogue browsing: a refetch-on-change cache, search, categories and
//! stock statistics.

use std::collections::BTreeSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{ChangeFeed, ProductRepository};
use crate::domain::product_service::map_product_error;
use crate::domain::{Actor, Error, Product};

/// Products shown per page.
pub const PAGE_SIZE: usize = 20;
/// Stock level below which a product counts as low.
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 20;

/// Search parameters for the product list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueQuery {
    /// Case-insensitive match on name, new code or old code.
    #[serde(default)]
    pub search: Option<String>,
    /// Exact category filter.
    #[serde(default)]
    pub category: Option<String>,
    /// 1-based page number.
    #[serde(default)]
    pub page: Option<usize>,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Dashboard stock figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueStats {
    pub total_products: usize,
    pub low_stock: usize,
    #[schema(value_type = f64)]
    pub total_value: Decimal,
}

/// Filter and paginate `products`, preserving their order.
pub fn search(products: &[Product], query: &CatalogueQuery) -> ProductPage {
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase);
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != "all");

    let matches: Vec<&Product> = products
        .iter()
        .filter(|product| {
            category.is_none_or(|wanted| product.fields.category.as_deref() == Some(wanted))
        })
        .filter(|product| needle.as_deref().is_none_or(|needle| matches_text(product, needle)))
        .collect();

    let total = matches.len();
    let total_pages = total.div_ceil(PAGE_SIZE);
    let page = query.page.unwrap_or(1).max(1);
    let items = matches
        .into_iter()
        .skip((page - 1).saturating_mul(PAGE_SIZE))
        .take(PAGE_SIZE)
        .cloned()
        .collect();
    ProductPage {
        items,
        page,
        per_page: PAGE_SIZE,
        total,
        total_pages,
    }
}

fn matches_text(product: &Product, needle: &str) -> bool {
    let fields = &product.fields;
    [
        Some(fields.name.as_str()),
        Some(fields.new_code.as_str()),
        fields.old_code.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|value| value.to_lowercase().contains(needle))
}

/// Sorted distinct non-empty categories.
pub fn categories(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .filter_map(|product| product.fields.category.clone())
        .filter(|category| !category.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Count products, low-stock products and total stock value.
///
/// The value saturates at [`Decimal::MAX`] rather than overflowing.
pub fn stats(products: &[Product], low_stock_threshold: u32) -> CatalogueStats {
    CatalogueStats {
        total_products: products.len(),
        low_stock: products
            .iter()
            .filter(|product| product.fields.stock < low_stock_threshold)
            .count(),
        total_value: products
            .iter()
            .map(|product| {
                product
                    .valuation_price()
                    .saturating_mul(Decimal::from(product.fields.stock))
            })
            .fold(Decimal::ZERO, Decimal::saturating_add),
    }
}

/// In-memory copy of the product list, refetched whenever the catalogue
/// changes.
pub struct CatalogueCache {
    products: Arc<dyn ProductRepository>,
    snapshot: RwLock<Option<Arc<Vec<Product>>>>,
}

impl CatalogueCache {
    /// Empty cache; the first read fetches.
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self {
            products,
            snapshot: RwLock::new(None),
        }
    }

    /// Current product list, fetching it if nothing is cached.
    pub async fn snapshot(&self) -> Result<Arc<Vec<Product>>, Error> {
        if let Some(products) = self.snapshot.read().await.as_ref() {
            return Ok(Arc::clone(products));
        }
        self.refresh().await
    }

    /// Refetch the whole list and replace the cached copy.
    pub async fn refresh(&self) -> Result<Arc<Vec<Product>>, Error> {
        let products = Arc::new(self.products.list().await.map_err(map_product_error)?);
        *self.snapshot.write().await = Some(Arc::clone(&products));
        debug!(count = products.len(), "catalogue refreshed");
        Ok(products)
    }

    /// Drop the cached copy so the next read refetches.
    pub async fn invalidate(&self) {
        *self.snapshot.write().await = None;
    }

    /// Refetch on every change notification until the feed closes.
    pub fn follow(self: Arc<Self>, feed: &dyn ChangeFeed) -> JoinHandle<()> {
        let mut changes = feed.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        if let Err(error) = self.refresh().await {
                            warn!(%error, "catalogue refresh failed; will refetch on next read");
                            self.invalidate().await;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Read-side catalogue operations for approved users.
#[derive(Clone)]
pub struct CatalogueService {
    cache: Arc<CatalogueCache>,
    low_stock_threshold: u32,
}

impl CatalogueService {
    /// Build the service over a shared cache.
    pub fn new(cache: Arc<CatalogueCache>) -> Self {
        Self {
            cache,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }

    /// Override the low-stock threshold.
    #[must_use]
    pub fn with_low_stock_threshold(mut self, threshold: u32) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    /// Search the catalogue.
    pub async fn search(&self, actor: &Actor, query: &CatalogueQuery) -> Result<ProductPage, Error> {
        actor.require_browse()?;
        Ok(search(&self.cache.snapshot().await?, query))
    }

    /// Distinct categories.
    pub async fn categories(&self, actor: &Actor) -> Result<Vec<String>, Error> {
        actor.require_browse()?;
        Ok(categories(&self.cache.snapshot().await?))
    }

    /// Stock statistics.
    pub async fn stats(&self, actor: &Actor) -> Result<CatalogueStats, Error> {
        actor.require_browse()?;
        Ok(stats(&self.cache.snapshot().await?, self.low_stock_threshold))
    }
}
