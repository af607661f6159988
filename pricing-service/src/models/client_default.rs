//! Default fee stored on a client's pricing profile.

use super::{FeePair, RuleEntityType, RuleRecord};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Client profile default. Keyed by client; sits below every zone tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ClientDefaultFee {
    pub client_id: Uuid,
    pub fee_usd: Decimal,
    pub fee_lbp: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl ClientDefaultFee {
    pub fn fee(&self) -> FeePair {
        FeePair::new(self.fee_usd, self.fee_lbp)
    }
}

impl RuleRecord for ClientDefaultFee {
    const ENTITY_TYPE: RuleEntityType = RuleEntityType::ClientDefault;

    fn record_id(&self) -> Uuid {
        self.client_id
    }

    fn version(&self) -> i64 {
        self.version
    }
}
