//! Wire rows exchanged with the store and their domain conversions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{
    AuditAction, AuditActorSummary, AuditLogEntry, NewAuditEntry, NewProfile, Product,
    ProductDraft, ProductId, Role, UserId, UserProfile,
};

pub(crate) const PRODUCTS: &str = "products";
pub(crate) const PROFILES: &str = "profiles";
pub(crate) const AUDIT_LOGS: &str = "audit_logs";

/// Row conversion failure; adapters surface it as a query error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{table} row {id} is malformed: {reason}")]
pub(crate) struct RowError {
    table: &'static str,
    id: Uuid,
    reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductRow {
    id: Uuid,
    old_code: Option<String>,
    new_code: String,
    description: Option<String>,
    sequence_number: Option<i64>,
    name: String,
    #[serde(default)]
    wholesale_price_min: Option<Decimal>,
    #[serde(default)]
    wholesale_price_max: Option<Decimal>,
    wholesale_price_notes: Option<String>,
    #[serde(default)]
    retail_price_min: Option<Decimal>,
    #[serde(default)]
    retail_price_max: Option<Decimal>,
    retail_price_notes: Option<String>,
    #[serde(default)]
    stock: i64,
    category: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: Option<Uuid>,
}

impl ProductRow {
    pub(crate) fn into_domain(self) -> Result<Product, RowError> {
        let stock = u32::try_from(self.stock).map_err(|_| RowError {
            table: PRODUCTS,
            id: self.id,
            reason: format!("stock {} is out of range", self.stock),
        })?;
        Ok(Product {
            id: ProductId::from_uuid(self.id),
            fields: ProductDraft {
                old_code: self.old_code,
                new_code: self.new_code,
                description: self.description,
                sequence_number: self.sequence_number,
                name: self.name,
                wholesale_price_min: self.wholesale_price_min,
                wholesale_price_max: self.wholesale_price_max,
                wholesale_price_notes: self.wholesale_price_notes,
                retail_price_min: self.retail_price_min,
                retail_price_max: self.retail_price_max,
                retail_price_notes: self.retail_price_notes,
                stock,
                category: self.category,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
            created_by: self.created_by.map(UserId::from_uuid),
        })
    }
}

/// Writable product columns. `created_by` is only sent on insert.
#[derive(Debug, Serialize)]
pub(crate) struct ProductWrite<'a> {
    old_code: Option<&'a str>,
    new_code: &'a str,
    description: Option<&'a str>,
    sequence_number: Option<i64>,
    name: &'a str,
    wholesale_price_min: Option<Decimal>,
    wholesale_price_max: Option<Decimal>,
    wholesale_price_notes: Option<&'a str>,
    retail_price_min: Option<Decimal>,
    retail_price_max: Option<Decimal>,
    retail_price_notes: Option<&'a str>,
    stock: u32,
    category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_by: Option<Uuid>,
}

impl<'a> ProductWrite<'a> {
    pub(crate) fn new(draft: &'a ProductDraft, created_by: Option<UserId>) -> Self {
        Self {
            old_code: draft.old_code.as_deref(),
            new_code: &draft.new_code,
            description: draft.description.as_deref(),
            sequence_number: draft.sequence_number,
            name: &draft.name,
            wholesale_price_min: draft.wholesale_price_min,
            wholesale_price_max: draft.wholesale_price_max,
            wholesale_price_notes: draft.wholesale_price_notes.as_deref(),
            retail_price_min: draft.retail_price_min,
            retail_price_max: draft.retail_price_max,
            retail_price_notes: draft.retail_price_notes.as_deref(),
            stock: draft.stock,
            category: draft.category.as_deref(),
            created_by: created_by.map(|id| *id.as_uuid()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileRow {
    id: Uuid,
    email: String,
    full_name: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
}

impl ProfileRow {
    pub(crate) fn into_domain(self) -> Result<UserProfile, RowError> {
        let role: Role = self.role.parse().map_err(|_| RowError {
            table: PROFILES,
            id: self.id,
            reason: format!("unknown role {}", self.role),
        })?;
        Ok(UserProfile {
            id: UserId::from_uuid(self.id),
            email: self.email,
            display_name: self.full_name,
            role,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProfileWrite<'a> {
    id: Uuid,
    email: &'a str,
    full_name: Option<&'a str>,
    role: &'static str,
}

impl<'a> ProfileWrite<'a> {
    pub(crate) fn new(profile: &'a NewProfile) -> Self {
        Self {
            id: *profile.id.as_uuid(),
            email: &profile.email,
            full_name: profile.display_name.as_deref(),
            role: profile.role.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RoleWrite {
    pub(crate) role: &'static str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuditRow {
    id: Uuid,
    user_id: Option<Uuid>,
    action: AuditAction,
    table_name: String,
    record_id: Option<String>,
    #[serde(default)]
    changes: Value,
    created_at: DateTime<Utc>,
    #[serde(default)]
    profiles: Option<AuditActorRow>,
}

#[derive(Debug, Deserialize)]
struct AuditActorRow {
    email: String,
    full_name: Option<String>,
}

impl AuditRow {
    pub(crate) fn into_domain(self) -> AuditLogEntry {
        AuditLogEntry {
            id: self.id,
            user_id: self.user_id.map(UserId::from_uuid),
            action: self.action,
            table_name: self.table_name,
            record_id: self.record_id,
            changes: self.changes,
            created_at: self.created_at,
            actor: self.profiles.map(|row| AuditActorSummary {
                email: row.email,
                display_name: row.full_name,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AuditWrite<'a> {
    user_id: Uuid,
    action: AuditAction,
    table_name: &'a str,
    record_id: Option<&'a str>,
    changes: &'a Value,
}

impl<'a> AuditWrite<'a> {
    pub(crate) fn new(entry: &'a NewAuditEntry) -> Self {
        Self {
            user_id: *entry.user_id.as_uuid(),
            action: entry.action,
            table_name: &entry.table_name,
            record_id: entry.record_id.as_deref(),
            changes: &entry.changes,
        }
    }
}
