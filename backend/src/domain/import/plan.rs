//! Strategy resolution and chunking of committable rows.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ProductDraft;

use super::validate::ImportRow;

/// How rows whose code already exists are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImportStrategy {
    /// Leave existing products untouched.
    #[default]
    Skip,
    /// Overwrite existing products keyed on new code.
    Replace,
}

impl ImportStrategy {
    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Replace => "replace",
        }
    }

    /// Whether `row` is committed under this strategy.
    pub fn admits(self, row: &ImportRow) -> bool {
        match self {
            Self::Skip => row.is_valid && !row.is_duplicate,
            Self::Replace => row.is_valid,
        }
    }
}

impl fmt::Display for ImportStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a strategy name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown import strategy '{0}'; expected skip|replace")]
pub struct StrategyParseError(pub String);

impl FromStr for ImportStrategy {
    type Err = StrategyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "replace" => Ok(Self::Replace),
            _ => Err(StrategyParseError(value.to_owned())),
        }
    }
}

/// A row selected for commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRow {
    pub draft: ProductDraft,
    /// Commit as an upsert keyed on new code instead of a plain insert.
    pub upsert: bool,
}

/// One chunk of planned rows, split by write kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannedChunk {
    pub inserts: Vec<ProductDraft>,
    pub upserts: Vec<ProductDraft>,
}

impl PlannedChunk {
    /// Rows in the chunk.
    pub fn len(&self) -> usize {
        self.inserts.len() + self.upserts.len()
    }

    /// Whether the chunk holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rows to commit, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPlan {
    strategy: ImportStrategy,
    rows: Vec<PlannedRow>,
}

impl ImportPlan {
    /// Select the rows `strategy` admits.
    pub fn new(rows: &[ImportRow], strategy: ImportStrategy) -> Self {
        let rows = rows
            .iter()
            .filter(|row| strategy.admits(row))
            .map(|row| PlannedRow {
                draft: row.record.clone(),
                upsert: row.is_duplicate,
            })
            .collect();
        Self { strategy, rows }
    }

    /// Strategy the plan was built for.
    pub fn strategy(&self) -> ImportStrategy {
        self.strategy
    }

    /// Number of rows to commit.
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    /// Planned rows in file order.
    pub fn rows(&self) -> &[PlannedRow] {
        &self.rows
    }

    /// Split into consecutive chunks of at most `size` rows.
    pub fn chunks(&self, size: NonZeroUsize) -> Vec<PlannedChunk> {
        self.rows
            .chunks(size.get())
            .map(|chunk| {
                let mut planned = PlannedChunk::default();
                for row in chunk {
                    if row.upsert {
                        planned.upserts.push(row.draft.clone());
                    } else {
                        planned.inserts.push(row.draft.clone());
                    }
                }
                planned
            })
            .collect()
    }
}

/// Rounded completion percentage after `imported` of `total` rows.
pub fn progress_percent(imported: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let rounded = (imported.min(total) * 100 + total / 2) / total;
    u8::try_from(rounded).unwrap_or(100)
}

/// Per-classification row counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub duplicates: usize,
    /// Rows committed with the `skip` strategy.
    pub committable_skip: usize,
    /// Rows committed with the `replace` strategy.
    pub committable_replace: usize,
}

impl ImportSummary {
    /// Count `rows` by classification.
    pub fn of(rows: &[ImportRow]) -> Self {
        rows.iter().fold(Self::default(), |mut summary, row| {
            summary.total += 1;
            if row.is_valid {
                summary.valid += 1;
            } else {
                summary.invalid += 1;
            }
            if row.is_duplicate {
                summary.duplicates += 1;
            }
            if ImportStrategy::Skip.admits(row) {
                summary.committable_skip += 1;
            }
            if ImportStrategy::Replace.admits(row) {
                summary.committable_replace += 1;
            }
            summary
        })
    }
}
