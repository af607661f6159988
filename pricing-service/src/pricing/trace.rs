//! Per-tier record of a resolution, for the explain endpoint and debug logs.
//!
//! The trace is write-only from the resolver's point of view: nothing in the
//! resolution path reads it back.

use crate::models::{GeoSpecificity, PricingResult};
use serde::Serialize;
use uuid::Uuid;

/// Resolution stage a trace step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStage {
    ClientOverride,
    ClientZone,
    ClientPackage,
    Zone,
    ClientDefault,
    Global,
    Extras,
}

impl TraceStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientOverride => "client_override",
            Self::ClientZone => "client_zone",
            Self::ClientPackage => "client_package",
            Self::Zone => "zone",
            Self::ClientDefault => "client_default",
            Self::Global => "global",
            Self::Extras => "extras",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Hit {
        rule_id: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        specificity: Option<GeoSpecificity>,
        candidates: usize,
    },
    Miss {
        candidates: usize,
    },
    Skipped {
        reason: &'static str,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceStep {
    pub stage: TraceStage,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Ordered list of stage outcomes for one resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolutionTrace {
    pub steps: Vec<TraceStep>,
}

impl ResolutionTrace {
    pub fn record(&mut self, stage: TraceStage, outcome: StepOutcome) {
        match &outcome {
            StepOutcome::Hit {
                rule_id,
                candidates,
                ..
            } => tracing::debug!(
                stage = stage.as_str(),
                rule_id = %rule_id,
                candidates = candidates,
                "Pricing tier matched"
            ),
            StepOutcome::Miss { candidates } => tracing::debug!(
                stage = stage.as_str(),
                candidates = candidates,
                "Pricing tier had no match"
            ),
            StepOutcome::Skipped { reason } => tracing::debug!(
                stage = stage.as_str(),
                reason = reason,
                "Pricing tier skipped"
            ),
            StepOutcome::Failed { error } => tracing::warn!(
                stage = stage.as_str(),
                error = %error,
                "Pricing tier read failed"
            ),
        }
        self.steps.push(TraceStep { stage, outcome });
    }

    pub fn step(&self, stage: TraceStage) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|step| step.stage == stage)
            .map(|step| &step.outcome)
    }
}

/// Result plus the trace that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct ExplainedResult {
    pub result: PricingResult,
    pub trace: ResolutionTrace,
}
