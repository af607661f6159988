//! Effective pricing resolution engine.
//!
//! [`PricingResolver`] walks the base-fee tiers against a [`RuleStore`],
//! [`ExtrasCombiner`] layers the package-type surcharge on top, and
//! [`ChangeAuditor`] builds the change-log entries every rule mutation must
//! append.

pub mod audit;
pub mod cache;
pub mod extras;
pub mod resolver;
pub mod specificity;
pub mod store;
pub mod trace;

pub use audit::ChangeAuditor;
pub use cache::{CacheKey, ResolutionCache};
pub use extras::{select_extra, ExtrasCombiner};
pub use resolver::{PricingResolver, ResolverSettings};
pub use store::{PackageFeeFilter, RuleStore, RuleWriter, ZoneRuleFilter};
pub use trace::{ExplainedResult, ResolutionTrace, StepOutcome, TraceStage, TraceStep};

use crate::services::PricingError;
use std::future::Future;
use std::time::Duration;

/// Run one rule-store read under the resolver's timeout, recording failures
/// in the trace. A timeout is reported as `StoreUnavailable`.
pub(crate) async fn timed_read<T, F>(
    limit: Duration,
    stage: TraceStage,
    trace: &mut ResolutionTrace,
    read: F,
) -> Result<T, PricingError>
where
    F: Future<Output = Result<T, PricingError>>,
{
    let outcome = match tokio::time::timeout(limit, read).await {
        Ok(result) => result,
        Err(_) => Err(PricingError::StoreUnavailable(format!(
            "{} read timed out after {}ms",
            stage.as_str(),
            limit.as_millis()
        ))),
    };

    outcome.map_err(|err| {
        trace.record(
            stage,
            StepOutcome::Failed {
                error: err.to_string(),
            },
        );
        err
    })
}
