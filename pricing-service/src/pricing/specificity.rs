//! Pure matching and tie-break rules shared by the resolver and the extras
//! combiner.

use crate::models::{GeoSpecificity, PackageTypeFee, PricingRequest, ZoneFeeRule};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use uuid::Uuid;

/// Labels (zone names, package types) compare case-insensitively after trimming.
pub fn labels_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// A NULL rule field matches anything; a set field needs an equal request value.
fn id_matches(rule: Option<Uuid>, request: Option<Uuid>) -> bool {
    match rule {
        None => true,
        Some(expected) => request == Some(expected),
    }
}

fn label_matches(rule: Option<&str>, request: Option<&str>) -> bool {
    match rule {
        None => true,
        Some(expected) => request.is_some_and(|actual| labels_match(expected, actual)),
    }
}

/// Most specific geographic field set on a rule, if any.
pub fn geo_specificity(
    governorate_id: Option<Uuid>,
    city_id: Option<Uuid>,
    zone_name: Option<&str>,
) -> Option<GeoSpecificity> {
    if city_id.is_some() {
        Some(GeoSpecificity::City)
    } else if zone_name.is_some() {
        Some(GeoSpecificity::ZoneName)
    } else if governorate_id.is_some() {
        Some(GeoSpecificity::Governorate)
    } else {
        None
    }
}

pub fn zone_rule_specificity(rule: &ZoneFeeRule) -> Option<GeoSpecificity> {
    geo_specificity(rule.governorate_id, rule.city_id, rule.zone_name.as_deref())
}

pub fn package_fee_specificity(fee: &PackageTypeFee) -> Option<GeoSpecificity> {
    geo_specificity(fee.governorate_id, fee.city_id, None)
}

/// Whether an active zone rule's geography and package scope fit the request.
/// Client scope is checked by the caller, since it decides the tier.
pub fn zone_rule_matches(rule: &ZoneFeeRule, request: &PricingRequest) -> bool {
    rule.is_active
        && id_matches(rule.governorate_id, request.governorate_id)
        && id_matches(rule.city_id, request.city_id)
        && label_matches(rule.zone_name.as_deref(), request.zone_name.as_deref())
        && label_matches(rule.package_type.as_deref(), request.package_type.as_deref())
}

/// Whether an active package-type fee applies to the request.
pub fn package_fee_matches(fee: &PackageTypeFee, request: &PricingRequest) -> bool {
    fee.is_active
        && request
            .package_type
            .as_deref()
            .is_some_and(|wanted| labels_match(&fee.package_type, wanted))
        && id_matches(fee.client_id, request.client_id)
        && id_matches(fee.governorate_id, request.governorate_id)
        && id_matches(fee.city_id, request.city_id)
}

/// Tie-break ordering: higher specificity first, then most recent
/// `updated_at`, then smallest id. Sorting with this puts the winner first.
pub fn winner_first(
    a: (Option<GeoSpecificity>, DateTime<Utc>, Uuid),
    b: (Option<GeoSpecificity>, DateTime<Utc>, Uuid),
) -> Ordering {
    b.0.cmp(&a.0)
        .then_with(|| b.1.cmp(&a.1))
        .then_with(|| a.2.cmp(&b.2))
}

/// Pick the winning zone rule among already-matched candidates.
pub fn best_zone_rule<'a, I>(candidates: I) -> Option<&'a ZoneFeeRule>
where
    I: IntoIterator<Item = &'a ZoneFeeRule>,
{
    candidates.into_iter().min_by(|a, b| {
        winner_first(
            (zone_rule_specificity(a), a.updated_at, a.id),
            (zone_rule_specificity(b), b.updated_at, b.id),
        )
    })
}

/// Pick the winning package fee among already-matched candidates of one tier.
pub fn best_package_fee<'a, I>(candidates: I) -> Option<&'a PackageTypeFee>
where
    I: IntoIterator<Item = &'a PackageTypeFee>,
{
    candidates.into_iter().min_by(|a, b| {
        winner_first(
            (package_fee_specificity(a), a.updated_at, a.id),
            (package_fee_specificity(b), b.updated_at, b.id),
        )
    })
}
