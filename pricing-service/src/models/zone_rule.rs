//! Geographic fee rules, optionally scoped to a client and/or package type.

use super::request::{normalize_label, PACKAGE_TYPE_MAX_LEN, ZONE_NAME_MAX_LEN};
use super::{FeePair, RuleEntityType, RuleRecord};
use crate::services::PricingError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Zone fee rule. NULL scoping fields mean "any".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ZoneFeeRule {
    pub id: Uuid,
    pub governorate_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub zone_name: Option<String>,
    pub client_id: Option<Uuid>,
    pub package_type: Option<String>,
    pub fee_usd: Decimal,
    pub fee_lbp: i64,
    pub is_active: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl ZoneFeeRule {
    pub fn fee(&self) -> FeePair {
        FeePair::new(self.fee_usd, self.fee_lbp)
    }

    pub fn has_geography(&self) -> bool {
        self.governorate_id.is_some() || self.city_id.is_some() || self.zone_name.is_some()
    }
}

impl RuleRecord for ZoneFeeRule {
    const ENTITY_TYPE: RuleEntityType = RuleEntityType::ZoneRule;

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }
}

/// Editable body of a zone rule, used for both create and full-replacement update.
#[derive(Debug, Clone)]
pub struct ZoneRuleInput {
    pub governorate_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub zone_name: Option<String>,
    pub client_id: Option<Uuid>,
    pub package_type: Option<String>,
    pub fee: FeePair,
    pub is_active: bool,
}

impl ZoneRuleInput {
    /// Validate and normalise the input.
    ///
    /// A rule needs at least one geographic field, unless it is scoped to both
    /// a client and a package type (the client-package tier).
    pub fn normalized(self) -> Result<Self, PricingError> {
        self.fee.check_bounds().map_err(PricingError::Validation)?;

        let zone_name = normalize_label(self.zone_name, "zone_name", ZONE_NAME_MAX_LEN)?;
        let package_type =
            normalize_label(self.package_type, "package_type", PACKAGE_TYPE_MAX_LEN)?;

        let has_geography =
            self.governorate_id.is_some() || self.city_id.is_some() || zone_name.is_some();
        if !has_geography && !(self.client_id.is_some() && package_type.is_some()) {
            return Err(PricingError::Validation(
                "zone rule needs a governorate, city or zone_name, or both client_id and package_type"
                    .to_string(),
            ));
        }

        Ok(Self {
            zone_name,
            package_type,
            ..self
        })
    }
}
