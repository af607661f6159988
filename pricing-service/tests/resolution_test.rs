//! End-to-end resolution through `PricingService` over the in-memory store.

mod common;

use common::{fee, memory_service, test_settings, usd, ADMIN};
use pricing_service::models::{
    BaseTier, CreateClientOverride, ExtrasTier, GeoSpecificity, PackageFeeInput, PricingRequest,
    UpdateClientOverride, ZoneRuleInput,
};
use pricing_service::services::PricingService;
use uuid::Uuid;

fn zone_rule(governorate_id: Option<Uuid>, cents: i64, lbp: i64) -> ZoneRuleInput {
    ZoneRuleInput {
        governorate_id,
        city_id: None,
        zone_name: None,
        client_id: None,
        package_type: None,
        fee: fee(cents, lbp),
        is_active: true,
    }
}

fn package_fee(package_type: &str, cents: i64, lbp: i64) -> PackageFeeInput {
    PackageFeeInput {
        package_type: package_type.to_string(),
        client_id: None,
        governorate_id: None,
        city_id: None,
        fee: fee(cents, lbp),
        is_active: true,
    }
}

fn request(client: Option<Uuid>, governorate: Option<Uuid>, package: Option<&str>) -> PricingRequest {
    PricingRequest {
        client_id: client,
        governorate_id: governorate,
        package_type: package.map(str::to_string),
        ..Default::default()
    }
}

/// Global 4.00/150000, governorate zone 3.00/100000, unscoped Bulky 1.00/20000.
async fn scenario_service(governorate: Uuid) -> PricingService {
    let service = memory_service(fee(400, 150_000), test_settings());
    service
        .create_zone_rule(zone_rule(Some(governorate), 300, 100_000), ADMIN)
        .await
        .unwrap();
    service
        .create_package_fee(package_fee("Bulky", 100, 20_000), ADMIN)
        .await
        .unwrap();
    service
}

#[tokio::test]
async fn zone_rule_plus_unscoped_surcharge() {
    let governorate = Uuid::new_v4();
    let service = scenario_service(governorate).await;

    let result = service
        .resolve(request(Some(Uuid::new_v4()), Some(governorate), Some("Bulky")))
        .await
        .unwrap();

    assert_eq!(result.source.base, BaseTier::Zone);
    assert_eq!(result.source.extras, ExtrasTier::Unscoped);
    assert_eq!(result.base(), fee(300, 100_000));
    assert_eq!(result.extra(), fee(100, 20_000));
    assert_eq!(result.total(), fee(400, 120_000));
    assert_eq!(result.base_specificity, Some(GeoSpecificity::Governorate));
    assert!(!result.is_degraded());
}

#[tokio::test]
async fn client_override_is_final_and_suppresses_extras() {
    let governorate = Uuid::new_v4();
    let service = scenario_service(governorate).await;
    let client = Uuid::new_v4();
    let over = service
        .create_client_override(
            CreateClientOverride {
                client_id: client,
                fee: fee(1000, 0),
                is_active: true,
            },
            ADMIN,
        )
        .await
        .unwrap();

    let result = service
        .resolve(request(Some(client), Some(governorate), Some("Bulky")))
        .await
        .unwrap();

    assert_eq!(result.source.base, BaseTier::ClientSpecific);
    assert_eq!(result.source.extras, ExtrasTier::Suppressed);
    assert_eq!(result.total(), fee(1000, 0));
    assert_eq!(result.base_rule_id, Some(over.id));
    assert_eq!(result.extra_rule_id, None);
}

#[tokio::test]
async fn empty_request_falls_back_to_global_default() {
    let service = memory_service(fee(400, 150_000), test_settings());

    let result = service.resolve(PricingRequest::default()).await.unwrap();

    assert_eq!(result.source.base, BaseTier::Global);
    assert_eq!(result.source.extras, ExtrasTier::NoMatch);
    assert_eq!(result.total(), fee(400, 150_000));
}

#[tokio::test]
async fn inactive_override_is_ignored() {
    let service = memory_service(fee(400, 150_000), test_settings());
    let client = Uuid::new_v4();
    let over = service
        .create_client_override(
            CreateClientOverride {
                client_id: client,
                fee: fee(1000, 0),
                is_active: true,
            },
            ADMIN,
        )
        .await
        .unwrap();

    service
        .update_client_override(
            over.id,
            UpdateClientOverride {
                fee: fee(1000, 0),
                is_active: false,
            },
            over.version,
            ADMIN,
        )
        .await
        .unwrap();

    let result = service
        .resolve(request(Some(client), None, None))
        .await
        .unwrap();
    assert_eq!(result.source.base, BaseTier::Global);
}

#[tokio::test]
async fn city_rule_beats_governorate_rule() {
    let service = memory_service(fee(400, 150_000), test_settings());
    let governorate = Uuid::new_v4();
    let city = Uuid::new_v4();

    service
        .create_zone_rule(zone_rule(Some(governorate), 300, 100_000), ADMIN)
        .await
        .unwrap();
    let city_rule = service
        .create_zone_rule(
            ZoneRuleInput {
                city_id: Some(city),
                ..zone_rule(Some(governorate), 200, 80_000)
            },
            ADMIN,
        )
        .await
        .unwrap();

    let result = service
        .resolve(PricingRequest {
            governorate_id: Some(governorate),
            city_id: Some(city),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(result.source.base, BaseTier::Zone);
    assert_eq!(result.base_rule_id, Some(city_rule.id));
    assert_eq!(result.base_specificity, Some(GeoSpecificity::City));
    assert_eq!(result.base(), fee(200, 80_000));
}

#[tokio::test]
async fn client_zone_rule_beats_public_zone_rule() {
    let service = memory_service(fee(400, 150_000), test_settings());
    let governorate = Uuid::new_v4();
    let client = Uuid::new_v4();

    service
        .create_zone_rule(zone_rule(Some(governorate), 300, 100_000), ADMIN)
        .await
        .unwrap();
    service
        .create_zone_rule(
            ZoneRuleInput {
                client_id: Some(client),
                ..zone_rule(Some(governorate), 250, 90_000)
            },
            ADMIN,
        )
        .await
        .unwrap();

    let result = service
        .resolve(request(Some(client), Some(governorate), None))
        .await
        .unwrap();
    assert_eq!(result.source.base, BaseTier::ClientZone);
    assert_eq!(result.base(), fee(250, 90_000));

    // Another client still sees the public rule.
    let result = service
        .resolve(request(Some(Uuid::new_v4()), Some(governorate), None))
        .await
        .unwrap();
    assert_eq!(result.source.base, BaseTier::Zone);
}

#[tokio::test]
async fn client_package_rule_applies_without_geography() {
    let service = memory_service(fee(400, 150_000), test_settings());
    let client = Uuid::new_v4();

    service
        .create_zone_rule(
            ZoneRuleInput {
                client_id: Some(client),
                package_type: Some("Bulky".to_string()),
                ..zone_rule(None, 600, 200_000)
            },
            ADMIN,
        )
        .await
        .unwrap();

    let result = service
        .resolve(request(Some(client), None, Some("bulky")))
        .await
        .unwrap();
    assert_eq!(result.source.base, BaseTier::ClientPackage);
    assert_eq!(result.base(), fee(600, 200_000));

    let result = service
        .resolve(request(Some(client), None, None))
        .await
        .unwrap();
    assert_eq!(result.source.base, BaseTier::Global);
}

#[tokio::test]
async fn client_default_used_when_no_zone_rule_matches() {
    let service = memory_service(fee(400, 150_000), test_settings());
    let client = Uuid::new_v4();
    service
        .set_client_default(client, fee(350, 120_000), None, ADMIN)
        .await
        .unwrap();

    let result = service
        .resolve(request(Some(client), Some(Uuid::new_v4()), None))
        .await
        .unwrap();
    assert_eq!(result.source.base, BaseTier::ClientDefault);
    assert_eq!(result.total(), fee(350, 120_000));

    // Zone rules outrank the client default.
    let governorate = Uuid::new_v4();
    service
        .create_zone_rule(zone_rule(Some(governorate), 300, 100_000), ADMIN)
        .await
        .unwrap();
    let result = service
        .resolve(request(Some(client), Some(governorate), None))
        .await
        .unwrap();
    assert_eq!(result.source.base, BaseTier::Zone);
}

#[tokio::test]
async fn client_scoped_surcharge_beats_unscoped() {
    let service = memory_service(fee(400, 150_000), test_settings());
    let client = Uuid::new_v4();
    service
        .create_package_fee(package_fee("Bulky", 100, 20_000), ADMIN)
        .await
        .unwrap();
    service
        .create_package_fee(
            PackageFeeInput {
                client_id: Some(client),
                ..package_fee("Bulky", 150, 30_000)
            },
            ADMIN,
        )
        .await
        .unwrap();

    let result = service
        .resolve(request(Some(client), None, Some("Bulky")))
        .await
        .unwrap();
    assert_eq!(result.source.base, BaseTier::Global);
    assert_eq!(result.source.extras, ExtrasTier::ClientOnly);
    assert_eq!(result.total(), fee(550, 180_000));
}

#[tokio::test]
async fn total_is_always_base_plus_extra() {
    let governorate = Uuid::new_v4();
    let service = scenario_service(governorate).await;

    let requests = [
        PricingRequest::default(),
        request(None, Some(governorate), None),
        request(None, Some(governorate), Some("Bulky")),
        request(Some(Uuid::new_v4()), None, Some("Bulky")),
    ];
    for req in requests {
        let result = service.resolve(req).await.unwrap();
        assert_eq!(result.total(), result.base() + result.extra());
    }
}

#[tokio::test]
async fn repeated_resolution_is_stable() {
    let governorate = Uuid::new_v4();
    let service = scenario_service(governorate).await;
    let req = request(Some(Uuid::new_v4()), Some(governorate), Some("Bulky"));

    let first = service.resolve(req.clone()).await.unwrap();
    let second = service.resolve(req).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn explain_reports_winning_tier_in_trace() {
    let governorate = Uuid::new_v4();
    let service = scenario_service(governorate).await;

    let explained = service
        .explain(request(None, Some(governorate), Some("Bulky")))
        .await
        .unwrap();

    assert_eq!(explained.result.source.base, BaseTier::Zone);
    assert!(!explained.trace.steps.is_empty());
    assert_eq!(explained.result.total(), fee(400, 120_000));
}

#[tokio::test]
async fn unknown_package_type_rejected_by_closed_catalog() {
    let mut settings = test_settings();
    settings.catalog = pricing_service::models::PackageCatalog::new(["Standard", "Bulky"]);
    let service = memory_service(fee(400, 150_000), settings);

    let err = service
        .resolve(request(None, None, Some("Piano")))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation");

    let ok = service
        .resolve(request(None, None, Some("bulky")))
        .await
        .unwrap();
    assert_eq!(ok.total(), fee(400, 150_000));
    assert_eq!(usd(400), ok.total_usd);
}
