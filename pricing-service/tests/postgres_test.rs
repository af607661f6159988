//! PostgreSQL rule store against a real database.
//!
//! Run with `TEST_DATABASE_URL=... cargo test -- --ignored`.

mod common;

use common::{fee, test_settings, TestDatabase, ADMIN};
use pricing_service::models::{
    BaseTier, ChangeAction, ChangeLogFilter, CreateClientOverride, ExtrasTier, PackageFeeInput,
    PricingRequest, RuleEntityType, ZoneRuleInput,
};
use pricing_service::pricing::RuleStore;
use pricing_service::services::PricingService;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn resolves_zone_and_override_scenarios() {
    let test_db = TestDatabase::create().await;
    let service = PricingService::new(Arc::new(test_db.db.clone()), test_settings());

    let global = service.global_default().await.unwrap();
    assert_eq!(global.version, 1);
    service
        .update_global_default(fee(400, 150_000), global.version, ADMIN)
        .await
        .unwrap();

    let governorate = Uuid::new_v4();
    service
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
    service
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

    let request = |client: Uuid| PricingRequest {
        client_id: Some(client),
        governorate_id: Some(governorate),
        package_type: Some("Bulky".to_string()),
        ..Default::default()
    };

    let result = service.resolve(request(Uuid::new_v4())).await.unwrap();
    assert_eq!(result.source.base, BaseTier::Zone);
    assert_eq!(result.source.extras, ExtrasTier::Unscoped);
    assert_eq!(result.total(), fee(400, 120_000));

    let client = Uuid::new_v4();
    service
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
    let result = service.resolve(request(client)).await.unwrap();
    assert_eq!(result.source.base, BaseTier::ClientSpecific);
    assert_eq!(result.total(), fee(1000, 0));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn mutations_are_versioned_and_audited() {
    let test_db = TestDatabase::create().await;
    let service = PricingService::new(Arc::new(test_db.db.clone()), test_settings());
    let client = Uuid::new_v4();

    let created = service
        .set_client_default(client, fee(350, 120_000), None, ADMIN)
        .await
        .unwrap();
    assert_eq!(created.version, 1);

    let updated = service
        .set_client_default(client, fee(375, 125_000), Some(1), ADMIN)
        .await
        .unwrap();
    assert_eq!(updated.version, 2);

    let stale = service
        .set_client_default(client, fee(400, 130_000), Some(1), ADMIN)
        .await
        .unwrap_err();
    assert_eq!(stale.kind(), "concurrent_modification");

    let over = CreateClientOverride {
        client_id: client,
        fee: fee(1000, 0),
        is_active: true,
    };
    service
        .create_client_override(over.clone(), ADMIN)
        .await
        .unwrap();
    let conflict = service
        .create_client_override(over, ADMIN)
        .await
        .unwrap_err();
    assert_eq!(conflict.kind(), "conflict");

    let entries = service
        .list_change_log(&ChangeLogFilter {
            entity_type: Some(RuleEntityType::ClientDefault),
            ..Default::default()
        })
        .await
        .unwrap();
    let actions: Vec<ChangeAction> = entries.iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![ChangeAction::Update, ChangeAction::Create]);
    assert!(entries.iter().all(|e| e.actor == ADMIN));
    // Rejected writes roll back without moving the rules revision.
    assert_eq!(test_db.db.rules_revision().await.unwrap(), 3);

    test_db.cleanup().await;
}
