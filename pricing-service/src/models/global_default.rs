//! System-wide fallback fee.

use super::{FeePair, RuleEntityType, RuleRecord};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The global default is a singleton; its change-log entries use this id.
pub const GLOBAL_DEFAULT_ID: Uuid = Uuid::nil();

/// Global default fee. Always exists and is never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GlobalDefaultFee {
    pub id: Uuid,
    pub fee_usd: Decimal,
    pub fee_lbp: i64,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl GlobalDefaultFee {
    /// Initial record written at setup.
    pub fn seed(fee: FeePair, actor: &str) -> Self {
        Self {
            id: GLOBAL_DEFAULT_ID,
            fee_usd: fee.usd,
            fee_lbp: fee.lbp,
            version: 1,
            updated_at: Utc::now(),
            updated_by: actor.to_string(),
        }
    }

    pub fn fee(&self) -> FeePair {
        FeePair::new(self.fee_usd, self.fee_lbp)
    }
}

impl RuleRecord for GlobalDefaultFee {
    const ENTITY_TYPE: RuleEntityType = RuleEntityType::GlobalDefault;

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }
}
