//! CSV product import.
//!
//! The pipeline reads CSV text into raw rows ([`parse`]), classifies each row
//! as valid, invalid or duplicate ([`validate`]), selects the rows a
//! [`ImportStrategy`] admits ([`plan`]) and commits them in sequential chunks
//! ([`ImportService`]). Rows are never rejected by throwing: every problem is
//! reported on the row itself.

mod columns;
mod numeric;
mod parse;
mod plan;
mod service;
mod template;
mod validate;

pub use columns::Column;
pub use numeric::{parse_decimal, parse_integer};
pub use parse::{CsvReadError, RawRow, read_rows};
pub use plan::{
    ImportPlan, ImportStrategy, ImportSummary, PlannedChunk, PlannedRow, StrategyParseError,
    progress_percent,
};
pub use service::{DEFAULT_CHUNK_SIZE, ImportOutcome, ImportPreview, ImportProgress, ImportService};
pub use template::{TEMPLATE_FILE_NAME, template_csv};
pub use validate::{DuplicateSource, ImportRow, validate_rows};
