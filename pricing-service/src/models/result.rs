//! Resolution output and provenance tags.

use super::FeePair;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Base-fee precedence tier that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseTier {
    ClientSpecific,
    ClientZone,
    ClientPackage,
    Zone,
    ClientDefault,
    Global,
    /// The rule store could not be read; the last known global default was used.
    Degraded,
}

impl BaseTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientSpecific => "client_specific",
            Self::ClientZone => "client_zone",
            Self::ClientPackage => "client_package",
            Self::Zone => "zone",
            Self::ClientDefault => "client_default",
            Self::Global => "global",
            Self::Degraded => "degraded",
        }
    }
}

impl std::fmt::Display for BaseTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Package-type surcharge tier that produced the extra fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrasTier {
    ClientGeography,
    ClientOnly,
    GeographyOnly,
    Unscoped,
    /// No surcharge matched, or the request named no package type.
    #[serde(rename = "none")]
    NoMatch,
    /// A client override is final; surcharges were not considered.
    Suppressed,
}

impl ExtrasTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientGeography => "client_geography",
            Self::ClientOnly => "client_only",
            Self::GeographyOnly => "geography_only",
            Self::Unscoped => "unscoped",
            Self::NoMatch => "none",
            Self::Suppressed => "suppressed",
        }
    }
}

impl std::fmt::Display for ExtrasTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How narrowly a matched rule was scoped geographically. Ordered from least
/// to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoSpecificity {
    Governorate,
    ZoneName,
    City,
}

/// Provenance of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PricingSource {
    pub base: BaseTier,
    pub extras: ExtrasTier,
}

/// Outcome of the base-tier search.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseSelection {
    pub tier: BaseTier,
    pub fee: FeePair,
    pub rule_id: Option<Uuid>,
    pub specificity: Option<GeoSpecificity>,
}

/// Outcome of the surcharge search.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraSelection {
    pub tier: ExtrasTier,
    pub fee: FeePair,
    pub rule_id: Option<Uuid>,
    pub specificity: Option<GeoSpecificity>,
}

impl ExtraSelection {
    pub fn no_match() -> Self {
        Self {
            tier: ExtrasTier::NoMatch,
            fee: FeePair::ZERO,
            rule_id: None,
            specificity: None,
        }
    }

    pub fn suppressed() -> Self {
        Self {
            tier: ExtrasTier::Suppressed,
            ..Self::no_match()
        }
    }
}

/// Resolver output. Built only through [`PricingResult::combine`] and
/// [`PricingResult::degraded`], so `total = base + extra` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub base_usd: Decimal,
    pub base_lbp: i64,
    pub extra_usd: Decimal,
    pub extra_lbp: i64,
    pub total_usd: Decimal,
    pub total_lbp: i64,
    pub source: PricingSource,
    pub base_rule_id: Option<Uuid>,
    pub base_specificity: Option<GeoSpecificity>,
    pub extra_rule_id: Option<Uuid>,
    pub extra_specificity: Option<GeoSpecificity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded_cause: Option<String>,
}

impl PricingResult {
    pub fn combine(base: BaseSelection, extra: ExtraSelection) -> Self {
        let total = base.fee + extra.fee;
        Self {
            base_usd: base.fee.usd,
            base_lbp: base.fee.lbp,
            extra_usd: extra.fee.usd,
            extra_lbp: extra.fee.lbp,
            total_usd: total.usd,
            total_lbp: total.lbp,
            source: PricingSource {
                base: base.tier,
                extras: extra.tier,
            },
            base_rule_id: base.rule_id,
            base_specificity: base.specificity,
            extra_rule_id: extra.rule_id,
            extra_specificity: extra.specificity,
            degraded_cause: None,
        }
    }

    /// Fallback result used when the rule store cannot be read.
    pub fn degraded(fallback: FeePair, cause: impl Into<String>) -> Self {
        let base = BaseSelection {
            tier: BaseTier::Degraded,
            fee: fallback,
            rule_id: None,
            specificity: None,
        };
        Self {
            degraded_cause: Some(cause.into()),
            ..Self::combine(base, ExtraSelection::no_match())
        }
    }

    pub fn base(&self) -> FeePair {
        FeePair::new(self.base_usd, self.base_lbp)
    }

    pub fn extra(&self) -> FeePair {
        FeePair::new(self.extra_usd, self.extra_lbp)
    }

    pub fn total(&self) -> FeePair {
        FeePair::new(self.total_usd, self.total_lbp)
    }

    pub fn is_degraded(&self) -> bool {
        self.source.base == BaseTier::Degraded
    }
}
