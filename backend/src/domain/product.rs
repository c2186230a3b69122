//! Product catalogue entities.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::UserId;

/// Stable product identifier assigned by the data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(Uuid);

impl ProductId {
    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a new random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Validation failures for product drafts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductValidationError {
    /// The new code was blank.
    #[error("new code is required")]
    MissingNewCode,
    /// The name was blank.
    #[error("name is required")]
    MissingName,
    /// A price range had `min > max`.
    #[error("{field} minimum must not exceed maximum")]
    InvertedPriceRange { field: &'static str },
}

impl ProductValidationError {
    /// Field name reported to clients.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingNewCode => "newCode",
            Self::MissingName => "name",
            Self::InvertedPriceRange { field } => field,
        }
    }
}

/// Editable product fields, as submitted by forms and CSV imports.
///
/// ## Invariants (checked by [`ProductDraft::validate`])
/// - `new_code` and `name` are non-blank once trimmed.
/// - each price range has `min <= max` when both ends are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    #[serde(default)]
    pub old_code: Option<String>,
    #[schema(example = "J006")]
    pub new_code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sequence_number: Option<i64>,
    #[schema(example = "ANTIMO SIRSAK GOLDEN CAIR 30 M2")]
    pub name: String,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub wholesale_price_min: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub wholesale_price_max: Option<Decimal>,
    #[serde(default)]
    pub wholesale_price_notes: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub retail_price_min: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub retail_price_max: Option<Decimal>,
    #[serde(default)]
    pub retail_price_notes: Option<String>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category: Option<String>,
}

impl ProductDraft {
    /// Trim text fields and collapse blank optional text to `None`.
    pub fn normalised(mut self) -> Self {
        self.new_code = self.new_code.trim().to_owned();
        self.name = self.name.trim().to_owned();
        for field in [
            &mut self.old_code,
            &mut self.description,
            &mut self.wholesale_price_notes,
            &mut self.retail_price_notes,
            &mut self.category,
        ] {
            *field = field
                .take()
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty());
        }
        self
    }

    /// Check the draft invariants, reporting the first violation.
    pub fn validate(&self) -> Result<(), ProductValidationError> {
        if self.new_code.trim().is_empty() {
            return Err(ProductValidationError::MissingNewCode);
        }
        if self.name.trim().is_empty() {
            return Err(ProductValidationError::MissingName);
        }
        check_range(
            "wholesalePrice",
            self.wholesale_price_min,
            self.wholesale_price_max,
        )?;
        check_range("retailPrice", self.retail_price_min, self.retail_price_max)
    }
}

fn check_range(
    field: &'static str,
    min: Option<Decimal>,
    max: Option<Decimal>,
) -> Result<(), ProductValidationError> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => {
            Err(ProductValidationError::InvertedPriceRange { field })
        }
        _ => Ok(()),
    }
}

/// A stored catalogue product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[schema(value_type = String, example = "0b6f1c7e-6a1d-4a63-9f7c-0e2a0f6bb0a1")]
    pub id: ProductId,
    #[serde(flatten)]
    pub fields: ProductDraft,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[schema(value_type = Option<String>)]
    pub created_by: Option<UserId>,
}

impl Product {
    /// Materialise a product from a validated draft.
    pub fn from_draft(
        id: ProductId,
        draft: ProductDraft,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            fields: draft,
            created_at: now,
            updated_at: now,
            created_by,
        }
    }

    /// Unique catalogue key.
    pub fn new_code(&self) -> &str {
        self.fields.new_code.as_str()
    }

    /// Unit price used for stock valuation: retail max, else retail min.
    pub fn valuation_price(&self) -> Decimal {
        self.fields
            .retail_price_max
            .or(self.fields.retail_price_min)
            .unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    fn draft(new_code: &str, name: &str) -> ProductDraft {
        ProductDraft {
            new_code: new_code.to_owned(),
            name: name.to_owned(),
            ..ProductDraft::default()
        }
    }

    #[rstest]
    #[case("", "Soap", ProductValidationError::MissingNewCode)]
    #[case("  ", "Soap", ProductValidationError::MissingNewCode)]
    #[case("J001", " ", ProductValidationError::MissingName)]
    fn rejects_missing_required_fields(
        #[case] code: &str,
        #[case] name: &str,
        #[case] expected: ProductValidationError,
    ) {
        assert_eq!(draft(code, name).validate(), Err(expected));
    }

    #[rstest]
    fn rejects_inverted_price_ranges() {
        let mut value = draft("J001", "Soap");
        value.retail_price_min = Some(Decimal::from(5_000));
        value.retail_price_max = Some(Decimal::from(4_000));
        let err = value.validate().expect_err("inverted range");
        assert_eq!(err.field(), "retailPrice");
    }

    #[rstest]
    fn normalised_trims_and_drops_blank_text() {
        let mut value = draft("  J001 ", " Soap ");
        value.category = Some("   ".to_owned());
        value.old_code = Some(" J000 ".to_owned());
        let value = value.normalised();
        assert_eq!(value.new_code, "J001");
        assert_eq!(value.name, "Soap");
        assert_eq!(value.category, None);
        assert_eq!(value.old_code.as_deref(), Some("J000"));
    }

    #[rstest]
    #[case(Some(3_700), Some(3_500), 3_700)]
    #[case(None, Some(3_500), 3_500)]
    #[case(None, None, 0)]
    fn valuation_price_prefers_retail_max(
        #[case] max: Option<i64>,
        #[case] min: Option<i64>,
        #[case] expected: i64,
    ) {
        let mut fields = draft("J001", "Soap");
        fields.retail_price_max = max.map(Decimal::from);
        fields.retail_price_min = min.map(Decimal::from);
        let product = Product::from_draft(ProductId::random(), fields, None, Utc::now());
        assert_eq!(product.valuation_price(), Decimal::from(expected));
    }
}
