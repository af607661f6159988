//! Additive package-type surcharges.

use super::request::{normalize_label, PACKAGE_TYPE_MAX_LEN};
use super::{FeePair, RuleEntityType, RuleRecord};
use crate::services::PricingError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Package-type fee. Never a base fee; always layered on top of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PackageTypeFee {
    pub id: Uuid,
    pub package_type: String,
    pub client_id: Option<Uuid>,
    pub governorate_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub fee_usd: Decimal,
    pub fee_lbp: i64,
    pub is_active: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl PackageTypeFee {
    pub fn fee(&self) -> FeePair {
        FeePair::new(self.fee_usd, self.fee_lbp)
    }

    pub fn has_geography(&self) -> bool {
        self.governorate_id.is_some() || self.city_id.is_some()
    }
}

impl RuleRecord for PackageTypeFee {
    const ENTITY_TYPE: RuleEntityType = RuleEntityType::PackageTypeFee;

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }
}

/// Editable body of a package-type fee.
#[derive(Debug, Clone)]
pub struct PackageFeeInput {
    pub package_type: String,
    pub client_id: Option<Uuid>,
    pub governorate_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub fee: FeePair,
    pub is_active: bool,
}

impl PackageFeeInput {
    pub fn normalized(self) -> Result<Self, PricingError> {
        self.fee.check_bounds().map_err(PricingError::Validation)?;

        let package_type = normalize_label(
            Some(self.package_type),
            "package_type",
            PACKAGE_TYPE_MAX_LEN,
        )?
        .ok_or_else(|| PricingError::Validation("package_type is required".to_string()))?;

        Ok(Self {
            package_type,
            ..self
        })
    }
}
