//! Preview and commit of CSV imports against the catalogue.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::domain::audit::{AuditAction, AuditTrail, NewAuditEntry};
use crate::domain::ports::{CatalogueChange, ChangeFeed, ProductRepository};
use crate::domain::product_service::map_product_error;
use crate::domain::{Actor, Error};

use super::parse::{CsvReadError, read_rows};
use super::plan::{ImportPlan, ImportStrategy, ImportSummary, progress_percent};
use super::validate::{ImportRow, validate_rows};

/// Rows committed per chunk unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(50) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

/// Classified rows returned by a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub rows: Vec<ImportRow>,
    pub summary: ImportSummary,
}

/// Progress reported after each committed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgress {
    pub imported: usize,
    pub total: usize,
    pub percent: u8,
}

/// Result of a completed commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub strategy: ImportStrategy,
    /// Rows read from the file.
    pub rows: usize,
    /// Rows written to the catalogue.
    pub imported: usize,
    pub inserted: usize,
    pub upserted: usize,
    /// Rows left out by validation or strategy.
    pub skipped: usize,
    /// Percentages reported after each chunk.
    pub progress: Vec<u8>,
}

#[derive(Debug, Default)]
struct Tally {
    imported: usize,
    inserted: usize,
    upserted: usize,
    progress: Vec<u8>,
}

/// Validates and commits product imports.
#[derive(Clone)]
pub struct ImportService {
    products: Arc<dyn ProductRepository>,
    audit: AuditTrail,
    changes: Arc<dyn ChangeFeed>,
    chunk_size: NonZeroUsize,
}

impl ImportService {
    /// Build the service with [`DEFAULT_CHUNK_SIZE`].
    pub fn new(
        products: Arc<dyn ProductRepository>,
        audit: AuditTrail,
        changes: Arc<dyn ChangeFeed>,
    ) -> Self {
        Self {
            products,
            audit,
            changes,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the number of rows committed per chunk.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: NonZeroUsize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Classify every row without writing anything.
    pub async fn preview(&self, actor: &Actor, csv: &str) -> Result<ImportPreview, Error> {
        actor.require_admin()?;
        let rows = self.classify(csv).await?;
        let summary = ImportSummary::of(&rows);
        Ok(ImportPreview { rows, summary })
    }

    /// Validate `csv` against the current catalogue and commit the rows
    /// `strategy` admits, calling `on_progress` after each chunk.
    ///
    /// Chunks are committed sequentially. A failing chunk stops the import;
    /// earlier chunks stay committed and the error details carry the count.
    pub async fn commit<F>(
        &self,
        actor: &Actor,
        csv: &str,
        strategy: ImportStrategy,
        on_progress: F,
    ) -> Result<ImportOutcome, Error>
    where
        F: FnMut(ImportProgress) + Send,
    {
        actor.require_admin()?;
        let rows = self.classify(csv).await?;
        let plan = ImportPlan::new(&rows, strategy);
        self.commit_plan(actor, &plan, rows.len(), on_progress)
            .await
    }

    /// Commit an already resolved plan.
    pub async fn commit_plan<F>(
        &self,
        actor: &Actor,
        plan: &ImportPlan,
        row_count: usize,
        mut on_progress: F,
    ) -> Result<ImportOutcome, Error>
    where
        F: FnMut(ImportProgress) + Send,
    {
        actor.require_admin()?;
        let total = plan.total();
        let mut tally = Tally::default();

        if total > 0 {
            let written = self
                .write_chunks(actor, plan, &mut tally, &mut on_progress)
                .await;
            if tally.imported > 0 {
                self.changes.publish(CatalogueChange::imported());
            }
            written?;

            self.audit
                .record(NewAuditEntry::new(
                    actor.user_id,
                    AuditAction::Import,
                    "products",
                    None,
                    json!({ "count": tally.imported, "strategy": plan.strategy().as_str() }),
                ))
                .await;
        }

        info!(
            strategy = %plan.strategy(),
            rows = row_count,
            imported = tally.imported,
            "product import committed"
        );
        Ok(ImportOutcome {
            strategy: plan.strategy(),
            rows: row_count,
            imported: tally.imported,
            inserted: tally.inserted,
            upserted: tally.upserted,
            skipped: row_count.saturating_sub(tally.imported),
            progress: tally.progress,
        })
    }

    async fn write_chunks<F>(
        &self,
        actor: &Actor,
        plan: &ImportPlan,
        tally: &mut Tally,
        on_progress: &mut F,
    ) -> Result<(), Error>
    where
        F: FnMut(ImportProgress) + Send,
    {
        let total = plan.total();
        let created_by = Some(actor.user_id);
        for (index, chunk) in plan.chunks(self.chunk_size).into_iter().enumerate() {
            let halted = |err| {
                warn!(chunk = index, imported = tally.imported, "import chunk failed");
                map_product_error(err).with_details(json!({
                    "imported": tally.imported,
                    "total": total,
                    "chunk": index,
                }))
            };
            if !chunk.inserts.is_empty() {
                self.products
                    .insert_batch(&chunk.inserts, created_by)
                    .await
                    .map_err(halted)?;
            }
            for draft in &chunk.upserts {
                self.products
                    .upsert_by_code(draft, created_by)
                    .await
                    .map_err(halted)?;
            }

            tally.inserted += chunk.inserts.len();
            tally.upserted += chunk.upserts.len();
            tally.imported += chunk.len();
            let percent = progress_percent(tally.imported, total);
            tally.progress.push(percent);
            debug!(chunk = index, imported = tally.imported, percent, "import chunk committed");
            on_progress(ImportProgress {
                imported: tally.imported,
                total,
                percent,
            });
        }
        Ok(())
    }

    async fn classify(&self, csv: &str) -> Result<Vec<ImportRow>, Error> {
        let raw = read_rows(csv).map_err(map_csv_error)?;
        let existing: HashSet<String> = self
            .products
            .list()
            .await
            .map_err(map_product_error)?
            .into_iter()
            .map(|product| product.fields.new_code)
            .collect();
        Ok(validate_rows(&raw, &existing))
    }
}

fn map_csv_error(error: CsvReadError) -> Error {
    match &error {
        CsvReadError::Malformed { line, .. } => {
            Error::invalid_request(error.to_string()).with_details(json!({ "line": line }))
        }
        CsvReadError::NoRows => Error::invalid_request(error.to_string()),
    }
}
