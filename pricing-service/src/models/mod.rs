//! Domain models for pricing-service.

mod change_log;
mod client_default;
mod client_override;
mod fee;
mod global_default;
mod package_fee;
mod request;
mod result;
mod zone_rule;

pub use change_log::{ChangeAction, ChangeLogFilter, PricingChangeLogEntry, RuleEntityType};
pub use client_default::ClientDefaultFee;
pub use client_override::{ClientOverrideFee, CreateClientOverride, UpdateClientOverride};
pub use fee::{max_fee_usd, FeePair, MAX_FEE_LBP, MAX_FEE_USD_SCALE};
pub use global_default::{GlobalDefaultFee, GLOBAL_DEFAULT_ID};
pub use package_fee::{PackageFeeInput, PackageTypeFee};
pub use request::{PackageCatalog, PricingRequest};
pub use result::{
    BaseSelection, BaseTier, ExtraSelection, ExtrasTier, GeoSpecificity, PricingResult,
    PricingSource,
};
pub use zone_rule::{ZoneFeeRule, ZoneRuleInput};

use serde::Serialize;
use uuid::Uuid;

/// Filter parameters for admin listings of rule records.
#[derive(Debug, Clone, Default)]
pub struct ListRulesFilter {
    pub client_id: Option<Uuid>,
    pub include_inactive: bool,
}

/// Common surface of every audited, versioned pricing record.
pub trait RuleRecord: Serialize + Clone + Send + Sync + 'static {
    const ENTITY_TYPE: RuleEntityType;

    /// Identifier recorded in the change log.
    fn record_id(&self) -> Uuid;

    /// Optimistic-concurrency version; starts at 1.
    fn version(&self) -> i64;
}
