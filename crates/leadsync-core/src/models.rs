use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::AppError;
use crate::sync::SyncSummary;

/// A single contact submitted for synchronization.
///
/// `email` is required: it is the identity the CRM upserts on. A JSON object
/// without an `email` key does not deserialize at all, which makes the whole
/// batch fail as a caller error rather than a data-quality rejection.
///
/// Inbound JSON may use either `first_name` or the CRM's `firstname`.
///
/// # Examples
///
/// ```
/// use leadsync_core::Record;
///
/// let record: Record = serde_json::from_str(
///     r#"{"firstname": "Ada", "email": "ada@example.com"}"#,
/// ).unwrap();
///
/// assert_eq!(record.first_name.as_deref(), Some("Ada"));
/// assert_eq!(record.email, "ada@example.com");
/// assert!(record.company.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, alias = "firstname", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastname", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

impl Record {
    /// Creates a record carrying only an email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }
}

/// What the CRM did with one submitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    Created,
    Updated,
}

/// One per-record entry of the CRM's batch upsert `results` list.
///
/// Only the fields the reconciliation needs are typed; everything else the
/// CRM returns (timestamps, archive flags, ...) is kept in `extras` so the
/// summary's `details` stay a faithful audit copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertResult {
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// `true` when the CRM created the contact, `false` when it updated one.
    #[serde(default, rename = "new")]
    pub is_new: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl UpsertResult {
    /// The email this result refers to.
    ///
    /// The CRM reports it either at the top level or inside `properties`.
    pub fn email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .or_else(|| self.properties.get("email").and_then(Value::as_str))
    }

    pub fn action(&self) -> UpsertAction {
        if self.is_new {
            UpsertAction::Created
        } else {
            UpsertAction::Updated
        }
    }
}

/// Reads an object id sent either as a JSON string or as a number.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(id)) => Some(id),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

/// Persisted, append-only record of one batch sync.
#[derive(Debug, FromRow, Serialize)]
pub struct ImportLog {
    pub id: Uuid,
    pub total_rows: i64,
    pub created_count: i64,
    pub updated_count: i64,
    pub error_count: i64,
    pub details: Json<Value>,
    pub errors: Json<Value>,
    pub created_at: DateTime<Utc>,
}

/// Insert DTO for [`ImportLog`]; the database assigns `id` and `created_at`.
#[derive(Debug, Clone, Serialize)]
pub struct NewImportLog {
    pub total_rows: i64,
    pub created_count: i64,
    pub updated_count: i64,
    pub error_count: i64,
    pub details: Value,
    pub errors: Value,
}

impl NewImportLog {
    /// Builds the log entry for a sync of `total_rows` input records.
    pub fn from_summary(total_rows: usize, summary: &SyncSummary) -> Result<Self, AppError> {
        Ok(Self {
            total_rows: total_rows as i64,
            created_count: summary.created_count as i64,
            updated_count: summary.updated_count as i64,
            error_count: summary.error_count as i64,
            details: serde_json::to_value(&summary.details)?,
            errors: serde_json::to_value(&summary.errors)?,
        })
    }
}
