//! Tiered precedence search for the base fee.

use super::extras::ExtrasCombiner;
use super::specificity::{best_zone_rule, zone_rule_matches, zone_rule_specificity};
use super::store::{RuleStore, ZoneRuleFilter};
use super::timed_read;
use super::trace::{ResolutionTrace, StepOutcome, TraceStage};
use crate::models::{BaseSelection, BaseTier, FeePair, PricingRequest, PricingResult, ZoneFeeRule};
use crate::services::metrics::record_degraded_resolution;
use crate::services::PricingError;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{instrument, warn};

/// Resolver tuning.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Upper bound on each rule-store read.
    pub store_timeout: Duration,
    /// Fee used for a degraded result before any global default was read.
    pub bootstrap_fee: FeePair,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_millis(500),
            bootstrap_fee: FeePair::ZERO,
        }
    }
}

/// Selects the base fee and provenance for a request, then hands off to
/// [`ExtrasCombiner`].
///
/// Precedence, first match wins:
/// client override, client zone rule, client package rule, zone rule,
/// client profile default, global default.
pub struct PricingResolver {
    store: Arc<dyn RuleStore>,
    extras: ExtrasCombiner,
    store_timeout: Duration,
    last_global: RwLock<FeePair>,
}

impl PricingResolver {
    pub fn new(store: Arc<dyn RuleStore>, settings: ResolverSettings) -> Self {
        Self {
            extras: ExtrasCombiner::new(store.clone(), settings.store_timeout),
            store,
            store_timeout: settings.store_timeout,
            last_global: RwLock::new(settings.bootstrap_fee),
        }
    }

    /// Resolve a validated request. Never fails: store errors produce a
    /// degraded result.
    pub async fn resolve(&self, request: &PricingRequest) -> PricingResult {
        self.resolve_with_trace(request).await.0
    }

    /// Resolve and return the per-tier trace alongside the result.
    #[instrument(
        skip(self, request),
        fields(
            client_id = ?request.client_id,
            governorate_id = ?request.governorate_id,
            city_id = ?request.city_id,
            package_type = ?request.package_type,
        )
    )]
    pub async fn resolve_with_trace(
        &self,
        request: &PricingRequest,
    ) -> (PricingResult, ResolutionTrace) {
        let mut trace = ResolutionTrace::default();

        let outcome = match self.select_base(request, &mut trace).await {
            Ok(base) => self.extras.apply_extras(base, request, &mut trace).await,
            Err(err) => Err(err),
        };

        let result = outcome.unwrap_or_else(|err| {
            let fallback = self.last_known_global();
            record_degraded_resolution(err.kind());
            warn!(
                error = %err,
                fallback = %fallback,
                "Rule store read failed, using last known global default"
            );
            PricingResult::degraded(fallback, err.to_string())
        });

        (result, trace)
    }

    /// Read the global default once so a degraded fallback has a real value
    /// even before the first resolution reaches the global tier.
    pub async fn prime(&self) -> Result<FeePair, PricingError> {
        let mut trace = ResolutionTrace::default();
        let global = timed_read(
            self.store_timeout,
            TraceStage::Global,
            &mut trace,
            self.store.get_global_default(),
        )
        .await?;
        self.remember_global(global.fee());
        Ok(global.fee())
    }

    /// Last successfully read global default (or the bootstrap fee).
    pub fn last_known_global(&self) -> FeePair {
        match self.last_global.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub(crate) fn remember_global(&self, fee: FeePair) {
        match self.last_global.write() {
            Ok(mut guard) => *guard = fee,
            Err(poisoned) => *poisoned.into_inner() = fee,
        }
    }

    async fn select_base(
        &self,
        request: &PricingRequest,
        trace: &mut ResolutionTrace,
    ) -> Result<BaseSelection, PricingError> {
        if let Some(client_id) = request.client_id {
            let found = timed_read(
                self.store_timeout,
                TraceStage::ClientOverride,
                trace,
                self.store.find_client_override(client_id),
            )
            .await?;

            if let Some(over) = found.filter(|o| o.is_active && o.client_id == client_id) {
                trace.record(
                    TraceStage::ClientOverride,
                    StepOutcome::Hit {
                        rule_id: over.id,
                        specificity: None,
                        candidates: 1,
                    },
                );
                return Ok(BaseSelection {
                    tier: BaseTier::ClientSpecific,
                    fee: over.fee(),
                    rule_id: Some(over.id),
                    specificity: None,
                });
            }
            trace.record(TraceStage::ClientOverride, StepOutcome::Miss { candidates: 0 });
        } else {
            trace.record(
                TraceStage::ClientOverride,
                StepOutcome::Skipped { reason: "no client" },
            );
        }

        let zone_stage = if request.client_id.is_some() {
            TraceStage::ClientZone
        } else {
            TraceStage::Zone
        };
        let rules = timed_read(
            self.store_timeout,
            zone_stage,
            trace,
            self.store.list_active_zone_rules(&ZoneRuleFilter::from(request)),
        )
        .await?;
        let matching: Vec<&ZoneFeeRule> = rules
            .iter()
            .filter(|rule| zone_rule_matches(rule, request))
            .collect();

        if let Some(client_id) = request.client_id {
            let client_zone = matching
                .iter()
                .copied()
                .filter(|r| r.client_id == Some(client_id) && r.has_geography());
            if let Some(hit) = pick(TraceStage::ClientZone, client_zone, trace) {
                return Ok(zone_selection(BaseTier::ClientZone, hit));
            }

            if request.package_type.is_some() {
                let client_package = matching.iter().copied().filter(|r| {
                    r.client_id == Some(client_id) && !r.has_geography() && r.package_type.is_some()
                });
                if let Some(hit) = pick(TraceStage::ClientPackage, client_package, trace) {
                    return Ok(zone_selection(BaseTier::ClientPackage, hit));
                }
            } else {
                trace.record(
                    TraceStage::ClientPackage,
                    StepOutcome::Skipped {
                        reason: "no package type",
                    },
                );
            }
        } else {
            trace.record(
                TraceStage::ClientZone,
                StepOutcome::Skipped { reason: "no client" },
            );
            trace.record(
                TraceStage::ClientPackage,
                StepOutcome::Skipped { reason: "no client" },
            );
        }

        let zone = matching
            .iter()
            .copied()
            .filter(|r| r.client_id.is_none() && r.has_geography());
        if let Some(hit) = pick(TraceStage::Zone, zone, trace) {
            return Ok(zone_selection(BaseTier::Zone, hit));
        }

        if let Some(client_id) = request.client_id {
            let default = timed_read(
                self.store_timeout,
                TraceStage::ClientDefault,
                trace,
                self.store.find_client_default(client_id),
            )
            .await?;
            if let Some(default) = default {
                trace.record(
                    TraceStage::ClientDefault,
                    StepOutcome::Hit {
                        rule_id: default.client_id,
                        specificity: None,
                        candidates: 1,
                    },
                );
                return Ok(BaseSelection {
                    tier: BaseTier::ClientDefault,
                    fee: default.fee(),
                    rule_id: Some(default.client_id),
                    specificity: None,
                });
            }
            trace.record(TraceStage::ClientDefault, StepOutcome::Miss { candidates: 0 });
        } else {
            trace.record(
                TraceStage::ClientDefault,
                StepOutcome::Skipped { reason: "no client" },
            );
        }

        let global = timed_read(
            self.store_timeout,
            TraceStage::Global,
            trace,
            self.store.get_global_default(),
        )
        .await?;
        self.remember_global(global.fee());
        trace.record(
            TraceStage::Global,
            StepOutcome::Hit {
                rule_id: global.id,
                specificity: None,
                candidates: 1,
            },
        );

        Ok(BaseSelection {
            tier: BaseTier::Global,
            fee: global.fee(),
            rule_id: Some(global.id),
            specificity: None,
        })
    }
}

/// Record the outcome of one zone tier and return its winner.
fn pick<'a, I>(
    stage: TraceStage,
    candidates: I,
    trace: &mut ResolutionTrace,
) -> Option<&'a ZoneFeeRule>
where
    I: Iterator<Item = &'a ZoneFeeRule>,
{
    let candidates: Vec<&ZoneFeeRule> = candidates.collect();
    let count = candidates.len();
    match best_zone_rule(candidates) {
        Some(hit) => {
            trace.record(
                stage,
                StepOutcome::Hit {
                    rule_id: hit.id,
                    specificity: zone_rule_specificity(hit),
                    candidates: count,
                },
            );
            Some(hit)
        }
        None => {
            trace.record(stage, StepOutcome::Miss { candidates: count });
            None
        }
    }
}

fn zone_selection(tier: BaseTier, rule: &ZoneFeeRule) -> BaseSelection {
    BaseSelection {
        tier,
        fee: rule.fee(),
        rule_id: Some(rule.id),
        specificity: zone_rule_specificity(rule),
    }
}
