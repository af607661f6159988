//! Immutable audit trail of pricing rule mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of pricing record a change-log entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RuleEntityType {
    GlobalDefault,
    ClientOverride,
    ClientDefault,
    ZoneRule,
    PackageTypeFee,
}

impl RuleEntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GlobalDefault => "global_default",
            Self::ClientOverride => "client_override",
            Self::ClientDefault => "client_default",
            Self::ZoneRule => "zone_rule",
            Self::PackageTypeFee => "package_type_fee",
        }
    }
}

impl std::fmt::Display for RuleEntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mutation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// One audit record. Never updated or deleted once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PricingChangeLogEntry {
    pub id: Uuid,
    pub entity_type: RuleEntityType,
    pub entity_id: Uuid,
    pub action: ChangeAction,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

/// Filter parameters for reading the change log. Results are newest first.
#[derive(Debug, Clone)]
pub struct ChangeLogFilter {
    pub entity_type: Option<RuleEntityType>,
    pub entity_id: Option<Uuid>,
    pub limit: i64,
}

impl Default for ChangeLogFilter {
    fn default() -> Self {
        Self {
            entity_type: None,
            entity_id: None,
            limit: 100,
        }
    }
}
