//! Behaviour when the rule store is unreachable or slow.

mod common;

use common::{cached_settings, fee, flaky_service, test_settings, ADMIN};
use pricing_service::models::{
    BaseTier, ExtrasTier, PackageFeeInput, PricingRequest, ZoneRuleInput,
};
use pricing_service::pricing::{RuleStore, RuleWriter};
use std::time::Duration;
use uuid::Uuid;

fn bulky_request(governorate: Uuid) -> PricingRequest {
    PricingRequest {
        governorate_id: Some(governorate),
        package_type: Some("Bulky".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn failing_store_yields_last_known_global_without_extras() {
    let (service, flaky, backing) = flaky_service(fee(400, 150_000), test_settings());
    let governorate = Uuid::new_v4();
    backing
        .create_zone_rule(
            ZoneRuleInput {
                governorate_id: Some(governorate),
                city_id: None,
                zone_name: None,
                client_id: None,
                package_type: None,
                fee: fee(300, 100_000),
                is_active: true,
            },
            ADMIN,
        )
        .await
        .unwrap();
    backing
        .create_package_fee(
            PackageFeeInput {
                package_type: "Bulky".to_string(),
                client_id: None,
                governorate_id: None,
                city_id: None,
                fee: fee(100, 20_000),
                is_active: true,
            },
            ADMIN,
        )
        .await
        .unwrap();

    service.prime().await.unwrap();
    flaky.set_failing(true);

    let result = service.resolve(bulky_request(governorate)).await.unwrap();

    assert!(result.is_degraded());
    assert_eq!(result.source.base, BaseTier::Degraded);
    assert_eq!(result.source.extras, ExtrasTier::NoMatch);
    assert_eq!(result.total(), fee(400, 150_000));
    assert!(result
        .degraded_cause
        .as_deref()
        .is_some_and(|cause| cause.contains("connection refused")));
}

#[tokio::test]
async fn slow_store_times_out_into_degraded_result() {
    let (service, flaky, _backing) = flaky_service(fee(400, 150_000), test_settings());
    service.prime().await.unwrap();
    flaky.set_delay(Duration::from_millis(500));

    let result = service.resolve(PricingRequest::default()).await.unwrap();

    assert_eq!(result.source.base, BaseTier::Degraded);
    assert_eq!(result.total(), fee(400, 150_000));
}

#[tokio::test]
async fn bootstrap_fee_used_before_any_global_read() {
    let mut settings = test_settings();
    settings.resolver.bootstrap_fee = fee(500, 450_000);
    let (service, flaky, _backing) = flaky_service(fee(400, 150_000), settings);
    flaky.set_failing(true);

    assert!(service.prime().await.is_err());
    let result = service.resolve(PricingRequest::default()).await.unwrap();

    assert_eq!(result.source.base, BaseTier::Degraded);
    assert_eq!(result.total(), fee(500, 450_000));
}

#[tokio::test]
async fn degraded_results_are_not_cached() {
    let (service, flaky, _backing) = flaky_service(fee(400, 150_000), cached_settings());
    flaky.set_failing(true);

    let degraded = service.resolve(PricingRequest::default()).await.unwrap();
    assert!(degraded.is_degraded());

    flaky.set_failing(false);
    let recovered = service.resolve(PricingRequest::default()).await.unwrap();
    assert_eq!(recovered.source.base, BaseTier::Global);
    assert_eq!(recovered.total(), fee(400, 150_000));
}

#[tokio::test]
async fn successful_global_read_refreshes_fallback() {
    let (service, flaky, backing) = flaky_service(fee(400, 150_000), test_settings());
    service.prime().await.unwrap();

    let current = backing.get_global_default().await.unwrap();
    backing
        .update_global_default(fee(450, 160_000), current.version, ADMIN)
        .await
        .unwrap();
    let fresh = service.resolve(PricingRequest::default()).await.unwrap();
    assert_eq!(fresh.total(), fee(450, 160_000));

    flaky.set_failing(true);
    let degraded = service.resolve(PricingRequest::default()).await.unwrap();
    assert_eq!(degraded.source.base, BaseTier::Degraded);
    assert_eq!(degraded.total(), fee(450, 160_000));
}

#[tokio::test]
async fn admin_global_update_refreshes_fallback() {
    let (service, flaky, _backing) = flaky_service(fee(400, 150_000), test_settings());
    service.prime().await.unwrap();

    let current = service.global_default().await.unwrap();
    service
        .update_global_default(fee(900, 800_000), current.version, ADMIN)
        .await
        .unwrap();

    flaky.set_failing(true);
    let degraded = service.resolve(PricingRequest::default()).await.unwrap();
    assert_eq!(degraded.source.base, BaseTier::Degraded);
    assert_eq!(degraded.total(), fee(900, 800_000));
}

#[tokio::test]
async fn health_check_reports_store_failure() {
    let (service, flaky, _backing) = flaky_service(fee(400, 150_000), test_settings());
    assert!(service.health_check().await.is_ok());

    flaky.set_failing(true);
    let err = service.health_check().await.unwrap_err();
    assert_eq!(err.kind(), "store_unavailable");
}
