use crate::models::PricingRequest;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Body of `POST /v1/pricing/resolve` and `POST /v1/pricing/explain`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ResolveFeeRequest {
    pub client_id: Option<Uuid>,
    pub governorate_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    #[validate(length(max = 120, message = "zone_name must be at most 120 characters"))]
    pub zone_name: Option<String>,
    #[validate(length(max = 64, message = "package_type must be at most 64 characters"))]
    pub package_type: Option<String>,
}

impl From<ResolveFeeRequest> for PricingRequest {
    fn from(body: ResolveFeeRequest) -> Self {
        PricingRequest {
            client_id: body.client_id,
            governorate_id: body.governorate_id,
            city_id: body.city_id,
            zone_name: body.zone_name,
            package_type: body.package_type,
        }
    }
}
