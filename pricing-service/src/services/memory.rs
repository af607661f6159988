//! In-process rule store.
//!
//! Backs `RULE_STORE=memory` deployments and the test suite. All tables sit
//! behind a single lock, so a mutation and its change-log entry land together
//! or not at all.

use crate::models::{
    ChangeLogFilter, ClientDefaultFee, ClientOverrideFee, CreateClientOverride, FeePair,
    GlobalDefaultFee, ListRulesFilter, PackageFeeInput, PackageTypeFee, PricingChangeLogEntry,
    RuleEntityType, UpdateClientOverride, ZoneFeeRule, ZoneRuleInput,
};
use crate::pricing::specificity::labels_match;
use crate::pricing::store::check_version;
use crate::pricing::{ChangeAuditor, PackageFeeFilter, RuleStore, RuleWriter, ZoneRuleFilter};
use crate::services::PricingError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

struct RuleTables {
    global: GlobalDefaultFee,
    overrides: HashMap<Uuid, ClientOverrideFee>,
    client_defaults: HashMap<Uuid, ClientDefaultFee>,
    zone_rules: HashMap<Uuid, ZoneFeeRule>,
    package_fees: HashMap<Uuid, PackageTypeFee>,
    change_log: Vec<PricingChangeLogEntry>,
    revision: i64,
}

impl RuleTables {
    fn record_change(&mut self, entry: PricingChangeLogEntry) {
        self.change_log.push(entry);
        self.revision += 1;
    }

    fn active_override_for(
        &self,
        client_id: Uuid,
        except: Option<Uuid>,
    ) -> Option<&ClientOverrideFee> {
        self.overrides
            .values()
            .filter(|o| o.client_id == client_id && o.is_active && Some(o.id) != except)
            .max_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| b.id.cmp(&a.id)))
    }
}

/// Rule store held entirely in memory.
pub struct InMemoryRuleStore {
    tables: RwLock<RuleTables>,
}

impl InMemoryRuleStore {
    /// Create an empty store whose global default is `global_fee` at version 1.
    pub fn new(global_fee: FeePair) -> Self {
        Self {
            tables: RwLock::new(RuleTables {
                global: GlobalDefaultFee::seed(global_fee, "system"),
                overrides: HashMap::new(),
                client_defaults: HashMap::new(),
                zone_rules: HashMap::new(),
                package_fees: HashMap::new(),
                change_log: Vec::new(),
                revision: 0,
            }),
        }
    }

    /// Number of change-log entries written so far.
    pub async fn change_log_len(&self) -> usize {
        self.tables.read().await.change_log.len()
    }
}

impl Default for InMemoryRuleStore {
    fn default() -> Self {
        Self::new(FeePair::ZERO)
    }
}

fn id_compatible(rule: Option<Uuid>, wanted: Option<Uuid>) -> bool {
    rule.is_none() || rule == wanted
}

fn label_compatible(rule: Option<&str>, wanted: Option<&str>) -> bool {
    match rule {
        None => true,
        Some(rule) => wanted.is_some_and(|wanted| labels_match(rule, wanted)),
    }
}

fn sorted_by_creation<T, F>(mut records: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> (chrono::DateTime<Utc>, Uuid),
{
    records.sort_by_key(key);
    records
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn get_global_default(&self) -> Result<GlobalDefaultFee, PricingError> {
        Ok(self.tables.read().await.global.clone())
    }

    async fn find_client_override(
        &self,
        client_id: Uuid,
    ) -> Result<Option<ClientOverrideFee>, PricingError> {
        let tables = self.tables.read().await;
        Ok(tables.active_override_for(client_id, None).cloned())
    }

    async fn find_client_default(
        &self,
        client_id: Uuid,
    ) -> Result<Option<ClientDefaultFee>, PricingError> {
        Ok(self.tables.read().await.client_defaults.get(&client_id).cloned())
    }

    async fn list_active_zone_rules(
        &self,
        filter: &ZoneRuleFilter,
    ) -> Result<Vec<ZoneFeeRule>, PricingError> {
        let tables = self.tables.read().await;
        Ok(tables
            .zone_rules
            .values()
            .filter(|r| {
                r.is_active
                    && id_compatible(r.client_id, filter.client_id)
                    && id_compatible(r.governorate_id, filter.governorate_id)
                    && id_compatible(r.city_id, filter.city_id)
                    && label_compatible(r.zone_name.as_deref(), filter.zone_name.as_deref())
                    && label_compatible(r.package_type.as_deref(), filter.package_type.as_deref())
            })
            .cloned()
            .collect())
    }

    async fn list_active_package_type_fees(
        &self,
        filter: &PackageFeeFilter,
    ) -> Result<Vec<PackageTypeFee>, PricingError> {
        let tables = self.tables.read().await;
        Ok(tables
            .package_fees
            .values()
            .filter(|f| {
                f.is_active
                    && labels_match(&f.package_type, &filter.package_type)
                    && id_compatible(f.client_id, filter.client_id)
                    && id_compatible(f.governorate_id, filter.governorate_id)
                    && id_compatible(f.city_id, filter.city_id)
            })
            .cloned()
            .collect())
    }

    async fn rules_revision(&self) -> Result<i64, PricingError> {
        Ok(self.tables.read().await.revision)
    }

    async fn health_check(&self) -> Result<(), PricingError> {
        Ok(())
    }
}

#[async_trait]
impl RuleWriter for InMemoryRuleStore {
    async fn update_global_default(
        &self,
        fee: FeePair,
        expected_version: i64,
        actor: &str,
    ) -> Result<GlobalDefaultFee, PricingError> {
        let mut tables = self.tables.write().await;
        let current = tables.global.clone();
        check_version(&current, expected_version)?;

        let updated = GlobalDefaultFee {
            fee_usd: fee.usd,
            fee_lbp: fee.lbp,
            version: current.version + 1,
            updated_at: Utc::now(),
            updated_by: actor.trim().to_string(),
            ..current.clone()
        };
        let entry = ChangeAuditor::updated(&current, &updated, actor)?;

        tables.global = updated.clone();
        tables.record_change(entry);
        info!(version = updated.version, fee = %fee, "Global default updated");
        Ok(updated)
    }

    async fn create_client_override(
        &self,
        input: CreateClientOverride,
        actor: &str,
    ) -> Result<ClientOverrideFee, PricingError> {
        let mut tables = self.tables.write().await;
        if input.is_active && tables.active_override_for(input.client_id, None).is_some() {
            return Err(PricingError::Conflict(format!(
                "client {} already has an active override",
                input.client_id
            )));
        }

        let now = Utc::now();
        let record = ClientOverrideFee {
            id: Uuid::new_v4(),
            client_id: input.client_id,
            fee_usd: input.fee.usd,
            fee_lbp: input.fee.lbp,
            is_active: input.is_active,
            version: 1,
            created_at: now,
            updated_at: now,
            created_by: actor.trim().to_string(),
            updated_by: actor.trim().to_string(),
        };
        let entry = ChangeAuditor::created(&record, actor)?;

        tables.overrides.insert(record.id, record.clone());
        tables.record_change(entry);
        Ok(record)
    }

    async fn update_client_override(
        &self,
        id: Uuid,
        input: UpdateClientOverride,
        expected_version: i64,
        actor: &str,
    ) -> Result<ClientOverrideFee, PricingError> {
        let mut tables = self.tables.write().await;
        let current = tables
            .overrides
            .get(&id)
            .cloned()
            .ok_or(PricingError::NotFound {
                entity: RuleEntityType::ClientOverride,
                id,
            })?;
        check_version(&current, expected_version)?;
        if input.is_active && tables.active_override_for(current.client_id, Some(id)).is_some() {
            return Err(PricingError::Conflict(format!(
                "client {} already has an active override",
                current.client_id
            )));
        }

        let updated = ClientOverrideFee {
            fee_usd: input.fee.usd,
            fee_lbp: input.fee.lbp,
            is_active: input.is_active,
            version: current.version + 1,
            updated_at: Utc::now(),
            updated_by: actor.trim().to_string(),
            ..current.clone()
        };
        let entry = ChangeAuditor::updated(&current, &updated, actor)?;

        tables.overrides.insert(id, updated.clone());
        tables.record_change(entry);
        Ok(updated)
    }

    async fn delete_client_override(
        &self,
        id: Uuid,
        expected_version: i64,
        actor: &str,
    ) -> Result<(), PricingError> {
        let mut tables = self.tables.write().await;
        let current = tables.overrides.get(&id).ok_or(PricingError::NotFound {
            entity: RuleEntityType::ClientOverride,
            id,
        })?;
        check_version(current, expected_version)?;
        let entry = ChangeAuditor::deleted(current, actor)?;

        tables.overrides.remove(&id);
        tables.record_change(entry);
        Ok(())
    }

    async fn get_client_override(
        &self,
        id: Uuid,
    ) -> Result<Option<ClientOverrideFee>, PricingError> {
        Ok(self.tables.read().await.overrides.get(&id).cloned())
    }

    async fn list_client_overrides(
        &self,
        filter: &ListRulesFilter,
    ) -> Result<Vec<ClientOverrideFee>, PricingError> {
        let tables = self.tables.read().await;
        let records: Vec<ClientOverrideFee> = tables
            .overrides
            .values()
            .filter(|o| filter.include_inactive || o.is_active)
            .filter(|o| filter.client_id.map_or(true, |c| o.client_id == c))
            .cloned()
            .collect();
        Ok(sorted_by_creation(records, |o| (o.created_at, o.id)))
    }

    async fn set_client_default(
        &self,
        client_id: Uuid,
        fee: FeePair,
        expected_version: Option<i64>,
        actor: &str,
    ) -> Result<ClientDefaultFee, PricingError> {
        let mut tables = self.tables.write().await;
        let existing = tables.client_defaults.get(&client_id).cloned();
        let now = Utc::now();

        let (record, entry) = match (existing, expected_version) {
            (None, None) => {
                let record = ClientDefaultFee {
                    client_id,
                    fee_usd: fee.usd,
                    fee_lbp: fee.lbp,
                    version: 1,
                    created_at: now,
                    updated_at: now,
                    created_by: actor.trim().to_string(),
                    updated_by: actor.trim().to_string(),
                };
                let entry = ChangeAuditor::created(&record, actor)?;
                (record, entry)
            }
            (Some(_), None) => {
                return Err(PricingError::Conflict(format!(
                    "client {} already has a default fee; pass expected_version to update it",
                    client_id
                )));
            }
            (None, Some(_)) => {
                return Err(PricingError::NotFound {
                    entity: RuleEntityType::ClientDefault,
                    id: client_id,
                });
            }
            (Some(current), Some(expected)) => {
                check_version(&current, expected)?;
                let record = ClientDefaultFee {
                    fee_usd: fee.usd,
                    fee_lbp: fee.lbp,
                    version: current.version + 1,
                    updated_at: now,
                    updated_by: actor.trim().to_string(),
                    ..current.clone()
                };
                let entry = ChangeAuditor::updated(&current, &record, actor)?;
                (record, entry)
            }
        };

        tables.client_defaults.insert(client_id, record.clone());
        tables.record_change(entry);
        Ok(record)
    }

    async fn delete_client_default(
        &self,
        client_id: Uuid,
        expected_version: i64,
        actor: &str,
    ) -> Result<(), PricingError> {
        let mut tables = self.tables.write().await;
        let current = tables
            .client_defaults
            .get(&client_id)
            .ok_or(PricingError::NotFound {
                entity: RuleEntityType::ClientDefault,
                id: client_id,
            })?;
        check_version(current, expected_version)?;
        let entry = ChangeAuditor::deleted(current, actor)?;

        tables.client_defaults.remove(&client_id);
        tables.record_change(entry);
        Ok(())
    }

    async fn create_zone_rule(
        &self,
        input: ZoneRuleInput,
        actor: &str,
    ) -> Result<ZoneFeeRule, PricingError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let record = ZoneFeeRule {
            id: Uuid::new_v4(),
            governorate_id: input.governorate_id,
            city_id: input.city_id,
            zone_name: input.zone_name,
            client_id: input.client_id,
            package_type: input.package_type,
            fee_usd: input.fee.usd,
            fee_lbp: input.fee.lbp,
            is_active: input.is_active,
            version: 1,
            created_at: now,
            updated_at: now,
            created_by: actor.trim().to_string(),
            updated_by: actor.trim().to_string(),
        };
        let entry = ChangeAuditor::created(&record, actor)?;

        tables.zone_rules.insert(record.id, record.clone());
        tables.record_change(entry);
        Ok(record)
    }

    async fn update_zone_rule(
        &self,
        id: Uuid,
        input: ZoneRuleInput,
        expected_version: i64,
        actor: &str,
    ) -> Result<ZoneFeeRule, PricingError> {
        let mut tables = self.tables.write().await;
        let current = tables
            .zone_rules
            .get(&id)
            .cloned()
            .ok_or(PricingError::NotFound {
                entity: RuleEntityType::ZoneRule,
                id,
            })?;
        check_version(&current, expected_version)?;

        let updated = ZoneFeeRule {
            governorate_id: input.governorate_id,
            city_id: input.city_id,
            zone_name: input.zone_name,
            client_id: input.client_id,
            package_type: input.package_type,
            fee_usd: input.fee.usd,
            fee_lbp: input.fee.lbp,
            is_active: input.is_active,
            version: current.version + 1,
            updated_at: Utc::now(),
            updated_by: actor.trim().to_string(),
            ..current.clone()
        };
        let entry = ChangeAuditor::updated(&current, &updated, actor)?;

        tables.zone_rules.insert(id, updated.clone());
        tables.record_change(entry);
        Ok(updated)
    }

    async fn delete_zone_rule(
        &self,
        id: Uuid,
        expected_version: i64,
        actor: &str,
    ) -> Result<(), PricingError> {
        let mut tables = self.tables.write().await;
        let current = tables.zone_rules.get(&id).ok_or(PricingError::NotFound {
            entity: RuleEntityType::ZoneRule,
            id,
        })?;
        check_version(current, expected_version)?;
        let entry = ChangeAuditor::deleted(current, actor)?;

        tables.zone_rules.remove(&id);
        tables.record_change(entry);
        Ok(())
    }

    async fn get_zone_rule(&self, id: Uuid) -> Result<Option<ZoneFeeRule>, PricingError> {
        Ok(self.tables.read().await.zone_rules.get(&id).cloned())
    }

    async fn list_zone_rules(
        &self,
        filter: &ListRulesFilter,
    ) -> Result<Vec<ZoneFeeRule>, PricingError> {
        let tables = self.tables.read().await;
        let records: Vec<ZoneFeeRule> = tables
            .zone_rules
            .values()
            .filter(|r| filter.include_inactive || r.is_active)
            .filter(|r| filter.client_id.is_none() || r.client_id == filter.client_id)
            .cloned()
            .collect();
        Ok(sorted_by_creation(records, |r| (r.created_at, r.id)))
    }

    async fn create_package_fee(
        &self,
        input: PackageFeeInput,
        actor: &str,
    ) -> Result<PackageTypeFee, PricingError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let record = PackageTypeFee {
            id: Uuid::new_v4(),
            package_type: input.package_type,
            client_id: input.client_id,
            governorate_id: input.governorate_id,
            city_id: input.city_id,
            fee_usd: input.fee.usd,
            fee_lbp: input.fee.lbp,
            is_active: input.is_active,
            version: 1,
            created_at: now,
            updated_at: now,
            created_by: actor.trim().to_string(),
            updated_by: actor.trim().to_string(),
        };
        let entry = ChangeAuditor::created(&record, actor)?;

        tables.package_fees.insert(record.id, record.clone());
        tables.record_change(entry);
        Ok(record)
    }

    async fn update_package_fee(
        &self,
        id: Uuid,
        input: PackageFeeInput,
        expected_version: i64,
        actor: &str,
    ) -> Result<PackageTypeFee, PricingError> {
        let mut tables = self.tables.write().await;
        let current = tables
            .package_fees
            .get(&id)
            .cloned()
            .ok_or(PricingError::NotFound {
                entity: RuleEntityType::PackageTypeFee,
                id,
            })?;
        check_version(&current, expected_version)?;

        let updated = PackageTypeFee {
            package_type: input.package_type,
            client_id: input.client_id,
            governorate_id: input.governorate_id,
            city_id: input.city_id,
            fee_usd: input.fee.usd,
            fee_lbp: input.fee.lbp,
            is_active: input.is_active,
            version: current.version + 1,
            updated_at: Utc::now(),
            updated_by: actor.trim().to_string(),
            ..current.clone()
        };
        let entry = ChangeAuditor::updated(&current, &updated, actor)?;

        tables.package_fees.insert(id, updated.clone());
        tables.record_change(entry);
        Ok(updated)
    }

    async fn delete_package_fee(
        &self,
        id: Uuid,
        expected_version: i64,
        actor: &str,
    ) -> Result<(), PricingError> {
        let mut tables = self.tables.write().await;
        let current = tables.package_fees.get(&id).ok_or(PricingError::NotFound {
            entity: RuleEntityType::PackageTypeFee,
            id,
        })?;
        check_version(current, expected_version)?;
        let entry = ChangeAuditor::deleted(current, actor)?;

        tables.package_fees.remove(&id);
        tables.record_change(entry);
        Ok(())
    }

    async fn get_package_fee(&self, id: Uuid) -> Result<Option<PackageTypeFee>, PricingError> {
        Ok(self.tables.read().await.package_fees.get(&id).cloned())
    }

    async fn list_package_fees(
        &self,
        filter: &ListRulesFilter,
    ) -> Result<Vec<PackageTypeFee>, PricingError> {
        let tables = self.tables.read().await;
        let records: Vec<PackageTypeFee> = tables
            .package_fees
            .values()
            .filter(|f| filter.include_inactive || f.is_active)
            .filter(|f| filter.client_id.is_none() || f.client_id == filter.client_id)
            .cloned()
            .collect();
        Ok(sorted_by_creation(records, |f| (f.created_at, f.id)))
    }

    async fn list_change_log(
        &self,
        filter: &ChangeLogFilter,
    ) -> Result<Vec<PricingChangeLogEntry>, PricingError> {
        let tables = self.tables.read().await;
        let limit = usize::try_from(filter.limit.max(0)).unwrap_or(0);
        Ok(tables
            .change_log
            .iter()
            .rev()
            .filter(|e| filter.entity_type.map_or(true, |t| e.entity_type == t))
            .filter(|e| filter.entity_id.map_or(true, |id| e.entity_id == id))
            .take(limit)
            .cloned()
            .collect())
    }
}
