//! Package-type surcharge selection.

use super::specificity::{best_package_fee, package_fee_matches, package_fee_specificity};
use super::store::{PackageFeeFilter, RuleStore};
use super::timed_read;
use super::trace::{ResolutionTrace, StepOutcome, TraceStage};
use crate::models::{
    BaseSelection, BaseTier, ExtraSelection, ExtrasTier, PackageTypeFee, PricingRequest,
    PricingResult,
};
use crate::services::PricingError;
use std::sync::Arc;
use std::time::Duration;

/// Surcharge tiers, most specific first.
const EXTRAS_PRECEDENCE: [ExtrasTier; 4] = [
    ExtrasTier::ClientGeography,
    ExtrasTier::ClientOnly,
    ExtrasTier::GeographyOnly,
    ExtrasTier::Unscoped,
];

/// Scope tier of a package fee.
pub fn extras_tier_of(fee: &PackageTypeFee) -> ExtrasTier {
    match (fee.client_id.is_some(), fee.has_geography()) {
        (true, true) => ExtrasTier::ClientGeography,
        (true, false) => ExtrasTier::ClientOnly,
        (false, true) => ExtrasTier::GeographyOnly,
        (false, false) => ExtrasTier::Unscoped,
    }
}

/// Pick the single best surcharge for a request from a candidate list.
pub fn select_extra(candidates: &[PackageTypeFee], request: &PricingRequest) -> ExtraSelection {
    let matching: Vec<&PackageTypeFee> = candidates
        .iter()
        .filter(|fee| package_fee_matches(fee, request))
        .collect();

    for tier in EXTRAS_PRECEDENCE {
        let in_tier = matching
            .iter()
            .copied()
            .filter(|fee| extras_tier_of(fee) == tier);
        if let Some(best) = best_package_fee(in_tier) {
            return ExtraSelection {
                tier,
                fee: best.fee(),
                rule_id: Some(best.id),
                specificity: package_fee_specificity(best),
            };
        }
    }

    ExtraSelection::no_match()
}

/// Layers the package-type surcharge on top of a selected base fee.
pub struct ExtrasCombiner {
    store: Arc<dyn RuleStore>,
    store_timeout: Duration,
}

impl ExtrasCombiner {
    pub fn new(store: Arc<dyn RuleStore>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// Combine `base` with the best matching surcharge. A client override is
    /// final, so extras are never looked up for it.
    pub async fn apply_extras(
        &self,
        base: BaseSelection,
        request: &PricingRequest,
        trace: &mut ResolutionTrace,
    ) -> Result<PricingResult, PricingError> {
        if base.tier == BaseTier::ClientSpecific {
            trace.record(
                TraceStage::Extras,
                StepOutcome::Skipped {
                    reason: "client override is final",
                },
            );
            return Ok(PricingResult::combine(base, ExtraSelection::suppressed()));
        }

        let Some(filter) = PackageFeeFilter::for_request(request) else {
            trace.record(
                TraceStage::Extras,
                StepOutcome::Skipped {
                    reason: "no package type",
                },
            );
            return Ok(PricingResult::combine(base, ExtraSelection::no_match()));
        };

        let candidates = timed_read(
            self.store_timeout,
            TraceStage::Extras,
            trace,
            self.store.list_active_package_type_fees(&filter),
        )
        .await?;

        let extra = select_extra(&candidates, request);
        match extra.rule_id {
            Some(rule_id) => trace.record(
                TraceStage::Extras,
                StepOutcome::Hit {
                    rule_id,
                    specificity: extra.specificity,
                    candidates: candidates.len(),
                },
            ),
            None => trace.record(
                TraceStage::Extras,
                StepOutcome::Miss {
                    candidates: candidates.len(),
                },
            ),
        }

        Ok(PricingResult::combine(base, extra))
    }
}
