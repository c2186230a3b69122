//! Row classification: required fields, numeric fields and duplicates.

use std::collections::HashSet;

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ProductDraft;

use super::columns::Column;
use super::numeric::{parse_decimal, parse_integer};
use super::parse::RawRow;

/// Where a duplicate code was first seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateSource {
    /// The code already exists in the catalogue.
    Catalogue,
    /// The code appeared on an earlier row of the same file.
    File,
}

/// A classified import row with its normalised record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    pub line: u64,
    pub record: ProductDraft,
    pub is_valid: bool,
    pub is_duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_source: Option<DuplicateSource>,
    /// Comma-joined validation messages for invalid rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Classify `rows` against the codes already in the catalogue.
///
/// Duplicates stay valid unless a required field is also missing; the
/// strategy decides later whether they are committed.
pub fn validate_rows(rows: &[RawRow], existing_codes: &HashSet<String>) -> Vec<ImportRow> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.iter()
        .map(|row| classify(row, existing_codes, &mut seen))
        .collect()
}

fn classify(
    row: &RawRow,
    existing_codes: &HashSet<String>,
    seen: &mut HashSet<String>,
) -> ImportRow {
    let mut errors = Vec::new();
    let new_code = row.get(Column::NewCode).to_owned();
    let name = row.get(Column::Name).to_owned();
    if new_code.is_empty() {
        errors.push("new code is required".to_owned());
    }
    if name.is_empty() {
        errors.push("name is required".to_owned());
    }

    let stock = match parse_integer(row.get(Column::Stock)).unwrap_or(0) {
        value if value < 0 => {
            errors.push("stock must not be negative".to_owned());
            0
        }
        value => u32::try_from(value).unwrap_or_else(|_| {
            errors.push("stock is too large".to_owned());
            0
        }),
    };

    let record = ProductDraft {
        old_code: row.optional(Column::OldCode),
        new_code,
        description: row.optional(Column::Description),
        sequence_number: parse_integer(row.get(Column::SequenceNumber)),
        name,
        wholesale_price_min: parse_decimal(row.get(Column::WholesalePriceMin)),
        wholesale_price_max: parse_decimal(row.get(Column::WholesalePriceMax)),
        wholesale_price_notes: row.optional(Column::WholesalePriceNotes),
        retail_price_min: parse_decimal(row.get(Column::RetailPriceMin)),
        retail_price_max: parse_decimal(row.get(Column::RetailPriceMax)),
        retail_price_notes: row.optional(Column::RetailPriceNotes),
        stock,
        category: row.optional(Column::Category),
    };

    if errors.is_empty() {
        if let Err(err) = record.validate() {
            errors.push(err.to_string());
        }
    }

    let duplicate_source = duplicate_source(&record.new_code, existing_codes, seen);
    ImportRow {
        line: row.line,
        record,
        is_valid: errors.is_empty(),
        is_duplicate: duplicate_source.is_some(),
        duplicate_source,
        error: (!errors.is_empty()).then(|| errors.join(", ")),
    }
}

fn duplicate_source(
    code: &str,
    existing_codes: &HashSet<String>,
    seen: &mut HashSet<String>,
) -> Option<DuplicateSource> {
    if code.is_empty() {
        return None;
    }
    let repeated = !seen.insert(code.to_owned());
    if existing_codes.contains(code) {
        Some(DuplicateSource::Catalogue)
    } else if repeated {
        Some(DuplicateSource::File)
    } else {
        None
    }
}
