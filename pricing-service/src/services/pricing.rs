//! Pricing service facade.
//!
//! Owns request validation, the optional resolution cache and the admin
//! mutation API. Every successful mutation invalidates the cache.

use crate::models::{
    ChangeAction, ChangeLogFilter, ClientDefaultFee, ClientOverrideFee, CreateClientOverride,
    FeePair, GlobalDefaultFee, ListRulesFilter, PackageCatalog, PackageFeeInput, PackageTypeFee,
    PricingChangeLogEntry, PricingRequest, PricingResult, RuleEntityType, UpdateClientOverride,
    ZoneFeeRule, ZoneRuleInput,
};
use crate::pricing::{
    CacheKey, ExplainedResult, PricingResolver, ResolutionCache, ResolverSettings, RuleStore,
    RuleWriter,
};
use crate::services::metrics::{
    record_cache_lookup, record_error, record_resolution, record_resolution_duration,
    record_rule_mutation,
};
use crate::services::PricingError;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Resolution cache tuning.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            max_entries: 10_000,
        }
    }
}

/// Everything the facade needs besides its store.
#[derive(Debug, Clone, Default)]
pub struct PricingSettings {
    pub resolver: ResolverSettings,
    /// `None` disables caching.
    pub cache: Option<CacheSettings>,
    pub catalog: PackageCatalog,
}

pub struct PricingService {
    resolver: PricingResolver,
    store: Arc<dyn RuleStore>,
    writer: Arc<dyn RuleWriter>,
    cache: Option<ResolutionCache>,
    catalog: PackageCatalog,
    store_timeout: Duration,
}

impl PricingService {
    /// Build the service over a store that implements both sides.
    pub fn new<S>(store: Arc<S>, settings: PricingSettings) -> Self
    where
        S: RuleStore + RuleWriter + 'static,
    {
        let reader: Arc<dyn RuleStore> = store.clone();
        let writer: Arc<dyn RuleWriter> = store;
        Self::from_parts(reader, writer, settings)
    }

    /// Build the service from separate read and write handles.
    pub fn from_parts(
        store: Arc<dyn RuleStore>,
        writer: Arc<dyn RuleWriter>,
        settings: PricingSettings,
    ) -> Self {
        let cache = settings
            .cache
            .map(|c| ResolutionCache::new(c.ttl, c.max_entries));
        let store_timeout = settings.resolver.store_timeout;
        Self {
            resolver: PricingResolver::new(store.clone(), settings.resolver),
            store,
            writer,
            cache,
            catalog: settings.catalog,
            store_timeout,
        }
    }

    pub fn catalog(&self) -> &PackageCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> Option<&ResolutionCache> {
        self.cache.as_ref()
    }

    /// Read the global default so degraded results have a real fallback.
    pub async fn prime(&self) -> Result<FeePair, PricingError> {
        self.resolver.prime().await
    }

    pub async fn health_check(&self) -> Result<(), PricingError> {
        self.store.health_check().await
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve the effective fee for a request.
    ///
    /// Only validation fails; rule-store trouble produces a degraded result.
    #[instrument(skip(self, request))]
    pub async fn resolve(&self, request: PricingRequest) -> Result<PricingResult, PricingError> {
        let started = Instant::now();
        let request = request.validate(&self.catalog).inspect_err(|e| {
            record_error(e.kind(), "resolve");
        })?;

        let key = CacheKey::from(&request);
        let generation = match self.usable_cache().await {
            Some(cache) => {
                if let Some(hit) = cache.get(&key) {
                    record_cache_lookup("hit");
                    record_resolution_duration(true, started.elapsed().as_secs_f64());
                    return Ok(hit);
                }
                record_cache_lookup("miss");
                Some(cache.generation())
            }
            None => None,
        };

        let result = self.resolver.resolve(&request).await;
        record_resolution(result.source.base.as_str(), result.source.extras.as_str());

        if let (Some(cache), Some(generation)) = (&self.cache, generation) {
            cache.insert(key, &result, generation);
        }
        record_resolution_duration(false, started.elapsed().as_secs_f64());

        Ok(result)
    }

    /// Resolve without the cache and return the per-tier trace.
    #[instrument(skip(self, request))]
    pub async fn explain(&self, request: PricingRequest) -> Result<ExplainedResult, PricingError> {
        let request = request.validate(&self.catalog).inspect_err(|e| {
            record_error(e.kind(), "explain");
        })?;
        let (result, trace) = self.resolver.resolve_with_trace(&request).await;
        Ok(ExplainedResult { result, trace })
    }

    // =========================================================================
    // Global Default
    // =========================================================================

    pub async fn global_default(&self) -> Result<GlobalDefaultFee, PricingError> {
        self.store.get_global_default().await
    }

    #[instrument(skip(self))]
    pub async fn update_global_default(
        &self,
        fee: FeePair,
        expected_version: i64,
        actor: &str,
    ) -> Result<GlobalDefaultFee, PricingError> {
        fee.check_bounds().map_err(PricingError::Validation)?;
        let updated = self
            .mutate(
                RuleEntityType::GlobalDefault,
                ChangeAction::Update,
                self.writer.update_global_default(fee, expected_version, actor),
            )
            .await?;
        self.resolver.remember_global(updated.fee());
        Ok(updated)
    }

    // =========================================================================
    // Client Overrides
    // =========================================================================

    #[instrument(skip(self, input), fields(client_id = %input.client_id))]
    pub async fn create_client_override(
        &self,
        input: CreateClientOverride,
        actor: &str,
    ) -> Result<ClientOverrideFee, PricingError> {
        input.validate()?;
        self.mutate(
            RuleEntityType::ClientOverride,
            ChangeAction::Create,
            self.writer.create_client_override(input, actor),
        )
        .await
    }

    #[instrument(skip(self, input))]
    pub async fn update_client_override(
        &self,
        id: Uuid,
        input: UpdateClientOverride,
        expected_version: i64,
        actor: &str,
    ) -> Result<ClientOverrideFee, PricingError> {
        input.validate()?;
        self.mutate(
            RuleEntityType::ClientOverride,
            ChangeAction::Update,
            self.writer
                .update_client_override(id, input, expected_version, actor),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_client_override(
        &self,
        id: Uuid,
        expected_version: i64,
        actor: &str,
    ) -> Result<(), PricingError> {
        self.mutate(
            RuleEntityType::ClientOverride,
            ChangeAction::Delete,
            self.writer.delete_client_override(id, expected_version, actor),
        )
        .await
    }

    pub async fn get_client_override(&self, id: Uuid) -> Result<ClientOverrideFee, PricingError> {
        self.writer
            .get_client_override(id)
            .await?
            .ok_or(PricingError::NotFound {
                entity: RuleEntityType::ClientOverride,
                id,
            })
    }

    pub async fn list_client_overrides(
        &self,
        filter: &ListRulesFilter,
    ) -> Result<Vec<ClientOverrideFee>, PricingError> {
        self.writer.list_client_overrides(filter).await
    }

    // =========================================================================
    // Client Defaults
    // =========================================================================

    pub async fn get_client_default(
        &self,
        client_id: Uuid,
    ) -> Result<ClientDefaultFee, PricingError> {
        self.store
            .find_client_default(client_id)
            .await?
            .ok_or(PricingError::NotFound {
                entity: RuleEntityType::ClientDefault,
                id: client_id,
            })
    }

    #[instrument(skip(self))]
    pub async fn set_client_default(
        &self,
        client_id: Uuid,
        fee: FeePair,
        expected_version: Option<i64>,
        actor: &str,
    ) -> Result<ClientDefaultFee, PricingError> {
        fee.check_bounds().map_err(PricingError::Validation)?;
        let action = if expected_version.is_some() {
            ChangeAction::Update
        } else {
            ChangeAction::Create
        };
        self.mutate(
            RuleEntityType::ClientDefault,
            action,
            self.writer
                .set_client_default(client_id, fee, expected_version, actor),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_client_default(
        &self,
        client_id: Uuid,
        expected_version: i64,
        actor: &str,
    ) -> Result<(), PricingError> {
        self.mutate(
            RuleEntityType::ClientDefault,
            ChangeAction::Delete,
            self.writer
                .delete_client_default(client_id, expected_version, actor),
        )
        .await
    }

    // =========================================================================
    // Zone Rules
    // =========================================================================

    #[instrument(skip(self, input))]
    pub async fn create_zone_rule(
        &self,
        input: ZoneRuleInput,
        actor: &str,
    ) -> Result<ZoneFeeRule, PricingError> {
        let input = self.prepare_zone_rule(input)?;
        self.mutate(
            RuleEntityType::ZoneRule,
            ChangeAction::Create,
            self.writer.create_zone_rule(input, actor),
        )
        .await
    }

    #[instrument(skip(self, input))]
    pub async fn update_zone_rule(
        &self,
        id: Uuid,
        input: ZoneRuleInput,
        expected_version: i64,
        actor: &str,
    ) -> Result<ZoneFeeRule, PricingError> {
        let input = self.prepare_zone_rule(input)?;
        self.mutate(
            RuleEntityType::ZoneRule,
            ChangeAction::Update,
            self.writer
                .update_zone_rule(id, input, expected_version, actor),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_zone_rule(
        &self,
        id: Uuid,
        expected_version: i64,
        actor: &str,
    ) -> Result<(), PricingError> {
        self.mutate(
            RuleEntityType::ZoneRule,
            ChangeAction::Delete,
            self.writer.delete_zone_rule(id, expected_version, actor),
        )
        .await
    }

    pub async fn get_zone_rule(&self, id: Uuid) -> Result<ZoneFeeRule, PricingError> {
        self.writer
            .get_zone_rule(id)
            .await?
            .ok_or(PricingError::NotFound {
                entity: RuleEntityType::ZoneRule,
                id,
            })
    }

    pub async fn list_zone_rules(
        &self,
        filter: &ListRulesFilter,
    ) -> Result<Vec<ZoneFeeRule>, PricingError> {
        self.writer.list_zone_rules(filter).await
    }

    // =========================================================================
    // Package-Type Fees
    // =========================================================================

    #[instrument(skip(self, input), fields(package_type = %input.package_type))]
    pub async fn create_package_fee(
        &self,
        input: PackageFeeInput,
        actor: &str,
    ) -> Result<PackageTypeFee, PricingError> {
        let input = self.prepare_package_fee(input)?;
        self.mutate(
            RuleEntityType::PackageTypeFee,
            ChangeAction::Create,
            self.writer.create_package_fee(input, actor),
        )
        .await
    }

    #[instrument(skip(self, input))]
    pub async fn update_package_fee(
        &self,
        id: Uuid,
        input: PackageFeeInput,
        expected_version: i64,
        actor: &str,
    ) -> Result<PackageTypeFee, PricingError> {
        let input = self.prepare_package_fee(input)?;
        self.mutate(
            RuleEntityType::PackageTypeFee,
            ChangeAction::Update,
            self.writer
                .update_package_fee(id, input, expected_version, actor),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_package_fee(
        &self,
        id: Uuid,
        expected_version: i64,
        actor: &str,
    ) -> Result<(), PricingError> {
        self.mutate(
            RuleEntityType::PackageTypeFee,
            ChangeAction::Delete,
            self.writer.delete_package_fee(id, expected_version, actor),
        )
        .await
    }

    pub async fn get_package_fee(&self, id: Uuid) -> Result<PackageTypeFee, PricingError> {
        self.writer
            .get_package_fee(id)
            .await?
            .ok_or(PricingError::NotFound {
                entity: RuleEntityType::PackageTypeFee,
                id,
            })
    }

    pub async fn list_package_fees(
        &self,
        filter: &ListRulesFilter,
    ) -> Result<Vec<PackageTypeFee>, PricingError> {
        self.writer.list_package_fees(filter).await
    }

    // =========================================================================
    // Change Log
    // =========================================================================

    pub async fn list_change_log(
        &self,
        filter: &ChangeLogFilter,
    ) -> Result<Vec<PricingChangeLogEntry>, PricingError> {
        if filter.limit < 1 || filter.limit > 1000 {
            return Err(PricingError::Validation(
                "limit must be between 1 and 1000".to_string(),
            ));
        }
        self.writer.list_change_log(filter).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// The cache, once it has been reconciled with the store's rules revision.
    /// `None` when caching is off or the revision cannot be read, in which
    /// case the request resolves straight against the store.
    async fn usable_cache(&self) -> Option<&ResolutionCache> {
        let cache = self.cache.as_ref()?;
        let revision = tokio::time::timeout(self.store_timeout, self.store.rules_revision()).await;
        match revision {
            Ok(Ok(revision)) => {
                if cache.observe_store_revision(revision) {
                    debug!(revision, "Rules revision moved, resolution cache cleared");
                }
                Some(cache)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "Rules revision read failed, bypassing cache");
                None
            }
            Err(_) => {
                warn!("Rules revision read timed out, bypassing cache");
                None
            }
        }
    }

    fn prepare_zone_rule(&self, input: ZoneRuleInput) -> Result<ZoneRuleInput, PricingError> {
        let input = input.normalized()?;
        let package_type = input
            .package_type
            .as_deref()
            .map(|p| self.catalog.canonical(p))
            .transpose()?;
        Ok(ZoneRuleInput {
            package_type,
            ..input
        })
    }

    fn prepare_package_fee(
        &self,
        input: PackageFeeInput,
    ) -> Result<PackageFeeInput, PricingError> {
        let input = input.normalized()?;
        let package_type = self.catalog.canonical(&input.package_type)?;
        Ok(PackageFeeInput {
            package_type,
            ..input
        })
    }

    /// Run a store mutation, then invalidate the cache and record the outcome.
    async fn mutate<T, F>(
        &self,
        entity: RuleEntityType,
        action: ChangeAction,
        op: F,
    ) -> Result<T, PricingError>
    where
        F: Future<Output = Result<T, PricingError>>,
    {
        match op.await {
            Ok(value) => {
                if let Some(cache) = &self.cache {
                    cache.invalidate_all();
                }
                record_rule_mutation(entity.as_str(), action.as_str(), "ok");
                info!(
                    entity = entity.as_str(),
                    action = action.as_str(),
                    "Pricing rule changed"
                );
                Ok(value)
            }
            Err(err) => {
                record_rule_mutation(entity.as_str(), action.as_str(), err.kind());
                if matches!(err, PricingError::StoreUnavailable(_) | PricingError::Internal(_)) {
                    record_error(err.kind(), action.as_str());
                }
                warn!(
                    entity = entity.as_str(),
                    action = action.as_str(),
                    error = %err,
                    "Pricing rule change rejected"
                );
                Err(err)
            }
        }
    }
}
