//! Per-client fixed fee that overrides all geography and package logic.

use super::{FeePair, RuleEntityType, RuleRecord};
use crate::services::PricingError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Client override fee. At most one active record per client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ClientOverrideFee {
    pub id: Uuid,
    pub client_id: Uuid,
    pub fee_usd: Decimal,
    pub fee_lbp: i64,
    pub is_active: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl ClientOverrideFee {
    pub fn fee(&self) -> FeePair {
        FeePair::new(self.fee_usd, self.fee_lbp)
    }
}

impl RuleRecord for ClientOverrideFee {
    const ENTITY_TYPE: RuleEntityType = RuleEntityType::ClientOverride;

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }
}

/// Input for creating a client override.
#[derive(Debug, Clone)]
pub struct CreateClientOverride {
    pub client_id: Uuid,
    pub fee: FeePair,
    pub is_active: bool,
}

impl CreateClientOverride {
    pub fn validate(&self) -> Result<(), PricingError> {
        self.fee.check_bounds().map_err(PricingError::Validation)
    }
}

/// Input for updating a client override. The client binding is immutable.
#[derive(Debug, Clone)]
pub struct UpdateClientOverride {
    pub fee: FeePair,
    pub is_active: bool,
}

impl UpdateClientOverride {
    pub fn validate(&self) -> Result<(), PricingError> {
        self.fee.check_bounds().map_err(PricingError::Validation)
    }
}
