//! Admin rule endpoints and the resolve endpoint over the axum router.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{empty_request, fee, json_body, json_request, memory_router};
use pricing_service::models::{
    BaseTier, ClientDefaultFee, ClientOverrideFee, GlobalDefaultFee, PackageCatalog,
    PricingChangeLogEntry, PricingResult, ZoneFeeRule,
};
use serde_json::json;
use tower::util::ServiceExt;
use uuid::Uuid;

fn catalog() -> PackageCatalog {
    PackageCatalog::new(["Standard", "Bulky"])
}

#[tokio::test]
async fn resolve_endpoint_returns_global_default() {
    let app = memory_router(fee(400, 150_000), catalog());

    let response = app
        .oneshot(json_request("POST", "/v1/pricing/resolve", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let result: PricingResult = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(result.source.base, BaseTier::Global);
    assert_eq!(result.total(), fee(400, 150_000));
}

#[tokio::test]
async fn resolve_rejects_unknown_package_type() {
    let app = memory_router(fee(400, 150_000), catalog());

    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/pricing/resolve",
            json!({ "package_type": "Piano" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn resolve_does_not_require_actor() {
    let app = memory_router(fee(400, 150_000), catalog());

    let request = Request::builder()
        .method("POST")
        .uri("/v1/pricing/resolve")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn mutation_without_actor_is_unauthorized() {
    let app = memory_router(fee(400, 150_000), catalog());

    let request = Request::builder()
        .method("POST")
        .uri("/v1/rules/client-overrides")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "client_id": Uuid::new_v4(),
                "fee_usd": "10.00",
                "fee_lbp": 0
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn negative_fee_fails_validation() {
    let app = memory_router(fee(400, 150_000), catalog());

    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/rules/client-overrides",
            json!({
                "client_id": Uuid::new_v4(),
                "fee_usd": "-1.00",
                "fee_lbp": 0
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn fee_with_excess_precision_fails_validation() {
    let app = memory_router(fee(400, 150_000), catalog());

    let response = app
        .oneshot(json_request(
            "PUT",
            "/v1/rules/global-default?expected_version=1",
            json!({ "fee_usd": "4.12345", "fee_lbp": 160000 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn create_override_then_resolve_uses_it() {
    let app = memory_router(fee(400, 150_000), catalog());
    let client = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/rules/client-overrides",
            json!({
                "client_id": client,
                "fee_usd": "10.00",
                "fee_lbp": 0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: ClientOverrideFee = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(created.version, 1);
    assert!(created.is_active);

    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/pricing/resolve",
            json!({ "client_id": client, "package_type": "Bulky" }),
        ))
        .await
        .unwrap();
    let result: PricingResult = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(result.source.base, BaseTier::ClientSpecific);
    assert_eq!(result.total(), fee(1000, 0));
}

#[tokio::test]
async fn second_active_override_conflicts() {
    let app = memory_router(fee(400, 150_000), catalog());
    let client = Uuid::new_v4();
    let body = json!({ "client_id": client, "fee_usd": "10.00", "fee_lbp": 0 });

    let first = app
        .clone()
        .oneshot(json_request("POST", "/v1/rules/client-overrides", body.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(json_request("POST", "/v1/rules/client-overrides", body))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn stale_version_update_is_rejected() {
    let app = memory_router(fee(400, 150_000), catalog());

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/v1/rules/global-default?expected_version=1",
            json!({ "fee_usd": "4.50", "fee_lbp": 160000 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: GlobalDefaultFee = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.fee(), fee(450, 160_000));

    let response = app
        .oneshot(json_request(
            "PUT",
            "/v1/rules/global-default?expected_version=1",
            json!({ "fee_usd": "5.00", "fee_lbp": 170000 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_updates_with_same_version_let_one_through() {
    let app = memory_router(fee(400, 150_000), catalog());

    let (first, second) = tokio::join!(
        app.clone().oneshot(json_request(
            "PUT",
            "/v1/rules/global-default?expected_version=1",
            json!({ "fee_usd": "4.50", "fee_lbp": 160000 }),
        )),
        app.clone().oneshot(json_request(
            "PUT",
            "/v1/rules/global-default?expected_version=1",
            json!({ "fee_usd": "5.00", "fee_lbp": 170000 }),
        )),
    );
    let mut statuses = vec![first.unwrap().status(), second.unwrap().status()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);

    let response = app
        .clone()
        .oneshot(empty_request(
            "GET",
            "/v1/rules/change-log?entity_type=global_default",
        ))
        .await
        .unwrap();
    let entries: Vec<PricingChangeLogEntry> =
        serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(entries.len(), 1);

    let response = app
        .oneshot(empty_request("GET", "/v1/rules/global-default"))
        .await
        .unwrap();
    let current: GlobalDefaultFee = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(current.version, 2);
}

#[tokio::test]
async fn update_without_version_is_rejected() {
    let app = memory_router(fee(400, 150_000), catalog());

    let response = app
        .oneshot(json_request(
            "PUT",
            "/v1/rules/global-default",
            json!({ "fee_usd": "4.50", "fee_lbp": 160000 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn zone_rule_with_unknown_package_type_is_rejected() {
    let app = memory_router(fee(400, 150_000), catalog());

    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/rules/zone-rules",
            json!({
                "governorate_id": Uuid::new_v4(),
                "package_type": "Piano",
                "fee_usd": "3.00",
                "fee_lbp": 100000
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn zone_rule_lifecycle() {
    let app = memory_router(fee(400, 150_000), catalog());
    let governorate = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/rules/zone-rules",
            json!({
                "governorate_id": governorate,
                "package_type": "bulky",
                "fee_usd": "3.00",
                "fee_lbp": 100000
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let rule: ZoneFeeRule = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(rule.package_type.as_deref(), Some("Bulky"));

    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/v1/rules/zone-rules/{}", rule.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(empty_request(
            "DELETE",
            &format!("/v1/rules/zone-rules/{}?expected_version={}", rule.id, rule.version),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(empty_request("GET", &format!("/v1/rules/zone-rules/{}", rule.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn client_default_put_creates_then_updates() {
    let app = memory_router(fee(400, 150_000), catalog());
    let client = Uuid::new_v4();
    let uri = format!("/v1/rules/client-defaults/{}", client);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &uri,
            json!({ "fee_usd": "3.50", "fee_lbp": 120000 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: ClientDefaultFee = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(created.version, 1);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("{}?expected_version=1", uri),
            json!({ "fee_usd": "3.75", "fee_lbp": 125000 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: ClientDefaultFee = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.fee(), fee(375, 125_000));

    let response = app
        .oneshot(empty_request("GET", &uri))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_override_is_not_found() {
    let app = memory_router(fee(400, 150_000), catalog());

    let response = app
        .oneshot(empty_request(
            "GET",
            &format!("/v1/rules/client-overrides/{}", Uuid::new_v4()),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn explain_endpoint_returns_trace() {
    let app = memory_router(fee(400, 150_000), catalog());

    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/pricing/explain",
            json!({ "client_id": Uuid::new_v4() }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["result"]["source"]["base"], "global");
    assert!(body["trace"]["steps"].as_array().is_some_and(|s| !s.is_empty()));
}
