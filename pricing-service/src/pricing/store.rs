//! Storage contracts consumed by the pricing engine.
//!
//! [`RuleStore`] is the read side the resolver depends on. [`RuleWriter`] is
//! the mutation side used by the admin API: every write is version-checked and
//! appends exactly one change-log entry in the same atomic unit.

use crate::models::{
    ChangeLogFilter, ClientDefaultFee, ClientOverrideFee, CreateClientOverride, FeePair,
    GlobalDefaultFee, ListRulesFilter, PackageFeeInput, PackageTypeFee, PricingChangeLogEntry,
    PricingRequest, UpdateClientOverride, ZoneFeeRule, ZoneRuleInput,
};
use crate::services::PricingError;
use async_trait::async_trait;
use uuid::Uuid;

/// Candidate filter for zone rules.
///
/// Stores return active rules whose scoping fields are each NULL or equal to
/// the filter value. Returning extra candidates is allowed; the resolver
/// re-checks every match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneRuleFilter {
    pub client_id: Option<Uuid>,
    pub governorate_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub zone_name: Option<String>,
    pub package_type: Option<String>,
}

impl From<&PricingRequest> for ZoneRuleFilter {
    fn from(request: &PricingRequest) -> Self {
        Self {
            client_id: request.client_id,
            governorate_id: request.governorate_id,
            city_id: request.city_id,
            zone_name: request.zone_name.clone(),
            package_type: request.package_type.clone(),
        }
    }
}

/// Candidate filter for package-type fees. The package type is mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFeeFilter {
    pub package_type: String,
    pub client_id: Option<Uuid>,
    pub governorate_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
}

impl PackageFeeFilter {
    pub fn for_request(request: &PricingRequest) -> Option<Self> {
        request.package_type.as_ref().map(|package_type| Self {
            package_type: package_type.clone(),
            client_id: request.client_id,
            governorate_id: request.governorate_id,
            city_id: request.city_id,
        })
    }
}

/// Read-only rule queries used during resolution.
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn get_global_default(&self) -> Result<GlobalDefaultFee, PricingError>;

    /// The active override for a client. If several are active, the most
    /// recently updated one is returned.
    async fn find_client_override(
        &self,
        client_id: Uuid,
    ) -> Result<Option<ClientOverrideFee>, PricingError>;

    async fn find_client_default(
        &self,
        client_id: Uuid,
    ) -> Result<Option<ClientDefaultFee>, PricingError>;

    async fn list_active_zone_rules(
        &self,
        filter: &ZoneRuleFilter,
    ) -> Result<Vec<ZoneFeeRule>, PricingError>;

    async fn list_active_package_type_fees(
        &self,
        filter: &PackageFeeFilter,
    ) -> Result<Vec<PackageTypeFee>, PricingError>;

    /// Monotonic counter bumped by every committed rule mutation, shared by
    /// all service instances over the same store.
    async fn rules_revision(&self) -> Result<i64, PricingError>;

    /// Liveness of the backing store.
    async fn health_check(&self) -> Result<(), PricingError>;
}

/// Audited, version-checked rule mutations plus admin reads.
#[async_trait]
pub trait RuleWriter: Send + Sync {
    async fn update_global_default(
        &self,
        fee: FeePair,
        expected_version: i64,
        actor: &str,
    ) -> Result<GlobalDefaultFee, PricingError>;

    async fn create_client_override(
        &self,
        input: CreateClientOverride,
        actor: &str,
    ) -> Result<ClientOverrideFee, PricingError>;

    async fn update_client_override(
        &self,
        id: Uuid,
        input: UpdateClientOverride,
        expected_version: i64,
        actor: &str,
    ) -> Result<ClientOverrideFee, PricingError>;

    async fn delete_client_override(
        &self,
        id: Uuid,
        expected_version: i64,
        actor: &str,
    ) -> Result<(), PricingError>;

    async fn get_client_override(&self, id: Uuid)
        -> Result<Option<ClientOverrideFee>, PricingError>;

    async fn list_client_overrides(
        &self,
        filter: &ListRulesFilter,
    ) -> Result<Vec<ClientOverrideFee>, PricingError>;

    /// Create the client default when `expected_version` is `None`, otherwise update it.
    async fn set_client_default(
        &self,
        client_id: Uuid,
        fee: FeePair,
        expected_version: Option<i64>,
        actor: &str,
    ) -> Result<ClientDefaultFee, PricingError>;

    async fn delete_client_default(
        &self,
        client_id: Uuid,
        expected_version: i64,
        actor: &str,
    ) -> Result<(), PricingError>;

    async fn create_zone_rule(
        &self,
        input: ZoneRuleInput,
        actor: &str,
    ) -> Result<ZoneFeeRule, PricingError>;

    async fn update_zone_rule(
        &self,
        id: Uuid,
        input: ZoneRuleInput,
        expected_version: i64,
        actor: &str,
    ) -> Result<ZoneFeeRule, PricingError>;

    async fn delete_zone_rule(
        &self,
        id: Uuid,
        expected_version: i64,
        actor: &str,
    ) -> Result<(), PricingError>;

    async fn get_zone_rule(&self, id: Uuid) -> Result<Option<ZoneFeeRule>, PricingError>;

    async fn list_zone_rules(
        &self,
        filter: &ListRulesFilter,
    ) -> Result<Vec<ZoneFeeRule>, PricingError>;

    async fn create_package_fee(
        &self,
        input: PackageFeeInput,
        actor: &str,
    ) -> Result<PackageTypeFee, PricingError>;

    async fn update_package_fee(
        &self,
        id: Uuid,
        input: PackageFeeInput,
        expected_version: i64,
        actor: &str,
    ) -> Result<PackageTypeFee, PricingError>;

    async fn delete_package_fee(
        &self,
        id: Uuid,
        expected_version: i64,
        actor: &str,
    ) -> Result<(), PricingError>;

    async fn get_package_fee(&self, id: Uuid) -> Result<Option<PackageTypeFee>, PricingError>;

    async fn list_package_fees(
        &self,
        filter: &ListRulesFilter,
    ) -> Result<Vec<PackageTypeFee>, PricingError>;

    async fn list_change_log(
        &self,
        filter: &ChangeLogFilter,
    ) -> Result<Vec<PricingChangeLogEntry>, PricingError>;
}

/// Version gate shared by every store implementation.
pub(crate) fn check_version<R: crate::models::RuleRecord>(
    current: &R,
    expected: i64,
) -> Result<(), PricingError> {
    if current.version() != expected {
        return Err(PricingError::ConcurrentModification {
            entity: R::ENTITY_TYPE,
            id: current.record_id(),
            expected,
            actual: current.version(),
        });
    }
    Ok(())
}
