use crate::models::{
    max_fee_usd, ChangeLogFilter, CreateClientOverride, FeePair, ListRulesFilter,
    PackageFeeInput, RuleEntityType, UpdateClientOverride, ZoneRuleInput, MAX_FEE_LBP,
    MAX_FEE_USD_SCALE,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn default_active() -> bool {
    true
}

fn validate_fee_usd(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("fee_usd_negative"));
    }
    if *value > max_fee_usd() {
        return Err(ValidationError::new("fee_usd_too_large"));
    }
    if value.normalize().scale() > MAX_FEE_USD_SCALE {
        return Err(ValidationError::new("fee_usd_too_precise"));
    }
    Ok(())
}

/// Fee amounts in both currencies.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FeeBody {
    #[validate(custom(function = "validate_fee_usd"))]
    pub fee_usd: Decimal,
    #[validate(range(min = 0, max = MAX_FEE_LBP, message = "fee_lbp out of range"))]
    pub fee_lbp: i64,
}

impl FeeBody {
    pub fn fee(&self) -> FeePair {
        FeePair::new(self.fee_usd, self.fee_lbp)
    }
}

/// `?expected_version=N` on updates and deletes.
#[derive(Debug, Deserialize, Validate)]
pub struct VersionParams {
    #[validate(range(min = 1, message = "expected_version must be at least 1"))]
    pub expected_version: i64,
}

/// Client defaults are created when no version is given.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct OptionalVersionParams {
    #[validate(range(min = 1, message = "expected_version must be at least 1"))]
    pub expected_version: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientOverrideRequest {
    pub client_id: Uuid,
    #[serde(flatten)]
    #[validate(nested)]
    pub fee: FeeBody,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl From<CreateClientOverrideRequest> for CreateClientOverride {
    fn from(body: CreateClientOverrideRequest) -> Self {
        CreateClientOverride {
            client_id: body.client_id,
            fee: body.fee.fee(),
            is_active: body.is_active,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClientOverrideRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub fee: FeeBody,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl From<UpdateClientOverrideRequest> for UpdateClientOverride {
    fn from(body: UpdateClientOverrideRequest) -> Self {
        UpdateClientOverride {
            fee: body.fee.fee(),
            is_active: body.is_active,
        }
    }
}

pub type ClientDefaultRequest = FeeBody;

#[derive(Debug, Deserialize, Validate)]
pub struct ZoneRuleRequest {
    pub governorate_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    #[validate(length(max = 120, message = "zone_name must be at most 120 characters"))]
    pub zone_name: Option<String>,
    pub client_id: Option<Uuid>,
    #[validate(length(max = 64, message = "package_type must be at most 64 characters"))]
    pub package_type: Option<String>,
    #[serde(flatten)]
    #[validate(nested)]
    pub fee: FeeBody,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl From<ZoneRuleRequest> for ZoneRuleInput {
    fn from(body: ZoneRuleRequest) -> Self {
        ZoneRuleInput {
            governorate_id: body.governorate_id,
            city_id: body.city_id,
            zone_name: body.zone_name,
            client_id: body.client_id,
            package_type: body.package_type,
            fee: body.fee.fee(),
            is_active: body.is_active,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PackageFeeRequest {
    #[validate(length(min = 1, max = 64, message = "package_type must be 1 to 64 characters"))]
    pub package_type: String,
    pub client_id: Option<Uuid>,
    pub governorate_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    #[serde(flatten)]
    #[validate(nested)]
    pub fee: FeeBody,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl From<PackageFeeRequest> for PackageFeeInput {
    fn from(body: PackageFeeRequest) -> Self {
        PackageFeeInput {
            package_type: body.package_type,
            client_id: body.client_id,
            governorate_id: body.governorate_id,
            city_id: body.city_id,
            fee: body.fee.fee(),
            is_active: body.is_active,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListRulesParams {
    pub client_id: Option<Uuid>,
    pub include_inactive: Option<bool>,
}

impl From<ListRulesParams> for ListRulesFilter {
    fn from(params: ListRulesParams) -> Self {
        ListRulesFilter {
            client_id: params.client_id,
            include_inactive: params.include_inactive.unwrap_or(false),
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ChangeLogParams {
    pub entity_type: Option<RuleEntityType>,
    pub entity_id: Option<Uuid>,
    #[validate(range(min = 1, max = 1000, message = "limit must be between 1 and 1000"))]
    pub limit: Option<i64>,
}

impl From<ChangeLogParams> for ChangeLogFilter {
    fn from(params: ChangeLogParams) -> Self {
        let defaults = ChangeLogFilter::default();
        ChangeLogFilter {
            entity_type: params.entity_type,
            entity_id: params.entity_id,
            limit: params.limit.unwrap_or(defaults.limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_usd_rejected() {
        let body = FeeBody {
            fee_usd: Decimal::new(-1, 0),
            fee_lbp: 0,
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_nested_fee_validated_on_zone_rule() {
        let body: ZoneRuleRequest = serde_json::from_value(serde_json::json!({
            "governorate_id": Uuid::new_v4(),
            "fee_usd": "3.00",
            "fee_lbp": -5
        }))
        .unwrap();
        assert!(body.is_active);
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_change_log_params_default_limit() {
        let filter = ChangeLogFilter::from(ChangeLogParams::default());
        assert_eq!(filter.limit, 100);
    }
}
