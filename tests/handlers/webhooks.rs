//! Payment confirmation webhook: end-to-end through the router

#[path = "../common/mod.rs"]
mod common;

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use common::*;
use mocap_store::handlers::webhooks::common::{CheckoutData, process_checkout, purchases_for_checkout};

fn test_state() -> AppState {
    create_test_app_state(UNREACHABLE_BASE, UNREACHABLE_BASE)
}

async fn deliver(state: &AppState, payload: &[u8]) -> (StatusCode, serde_json::Value) {
    let signature = stripe_signature_header(payload);
    let response = app(state.clone())
        .oneshot(webhook_request(payload, Some(&signature)))
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

// ============ Fulfillment ============

#[tokio::test]
async fn test_single_purchase_is_recorded() {
    let state = test_state();
    let payload = checkout_completed_event(
        "cs_test_single",
        Some("U1"),
        single_metadata("A1", "Walk Cycle"),
        2999,
    );

    let (status, body) = deliver(&state, &payload).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"received": true}));

    let rows = purchases_for_session(&state, "cs_test_single");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, "U1");
    assert_eq!(rows[0].animation_id, "A1");
    assert_eq!(rows[0].amount_paid.to_string(), "29.99");
}

#[tokio::test]
async fn test_cart_purchase_splits_amount_across_items() {
    let state = test_state();
    let payload = checkout_completed_event("cs_test_cart", Some("U1"), cart_metadata("A1,A2"), 3000);

    let (status, _) = deliver(&state, &payload).await;
    assert_eq!(status, StatusCode::OK);

    let rows = purchases_for_session(&state, "cs_test_cart");
    let ids: Vec<_> = rows.iter().map(|r| r.animation_id.as_str()).collect();
    assert_eq!(ids, ["A1", "A2"]);
    for row in &rows {
        assert_eq!(row.amount_paid.to_string(), "15.00");
        assert_eq!(row.user_id, "U1");
    }
}

#[tokio::test]
async fn test_cart_split_drops_remainder_cents() {
    let state = test_state();
    let payload = checkout_completed_event("cs_test_odd", Some("U1"), cart_metadata("A1,A2,A3"), 1000);

    deliver(&state, &payload).await;

    let rows = purchases_for_session(&state, "cs_test_odd");
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.amount_paid.to_string() == "3.33"));
}

#[tokio::test]
async fn test_storefront_single_metadata_is_recorded() {
    let state = test_state();
    let payload = checkout_completed_event(
        "cs_test_store_single",
        Some("U1"),
        json!({"isCart": "false", "animationId": "A1"}),
        2999,
    );

    let (status, body) = deliver(&state, &payload).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"received": true}));
    let rows = purchases_for_session(&state, "cs_test_store_single");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, "U1");
    assert_eq!(rows[0].animation_id, "A1");
    assert_eq!(rows[0].amount_paid.to_string(), "29.99");
}

#[tokio::test]
async fn test_storefront_cart_metadata_is_split() {
    let state = test_state();
    let payload = checkout_completed_event(
        "cs_test_store_cart",
        Some("U1"),
        json!({"isCart": "true", "animationIds": "A1,A2"}),
        3000,
    );

    let (status, _) = deliver(&state, &payload).await;

    assert_eq!(status, StatusCode::OK);
    let rows = purchases_for_session(&state, "cs_test_store_cart");
    let ids: Vec<_> = rows.iter().map(|r| r.animation_id.as_str()).collect();
    assert_eq!(ids, ["A1", "A2"]);
    assert!(rows.iter().all(|r| r.amount_paid.to_string() == "15.00"));
}

#[tokio::test]
async fn test_snake_case_metadata_is_still_read() {
    let state = test_state();
    let payload = checkout_completed_event(
        "cs_test_snake",
        Some("U1"),
        json!({"is_cart": "true", "animation_ids": "A1,A2"}),
        3000,
    );

    let (status, _) = deliver(&state, &payload).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(purchases_for_session(&state, "cs_test_snake").len(), 2);
}

#[tokio::test]
async fn test_escaped_comma_stays_inside_one_id() {
    let state = test_state();
    let payload = checkout_completed_event(
        "cs_test_escaped",
        Some("U1"),
        cart_metadata(r"pack\,one,A2"),
        2000,
    );

    deliver(&state, &payload).await;

    let rows = purchases_for_session(&state, "cs_test_escaped");
    let ids: Vec<_> = rows.iter().map(|r| r.animation_id.as_str()).collect();
    assert_eq!(ids, ["pack,one", "A2"]);
}

#[tokio::test]
async fn test_missing_user_is_rejected_before_metadata() {
    let state = test_state();
    let payload = checkout_completed_event("cs_test_guest", None, json!({}), 2999);

    let (status, body) = deliver(&state, &payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing user ID");
    assert!(purchases_for_session(&state, "cs_test_guest").is_empty());
}

#[tokio::test]
async fn test_single_without_animation_id_is_rejected() {
    let state = test_state();
    let payload = checkout_completed_event("cs_test_noid", Some("U1"), json!({"isCart": "false"}), 100);

    let (status, body) = deliver(&state, &payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing animation ID");
}

#[tokio::test]
async fn test_cart_with_only_delimiters_is_rejected() {
    let state = test_state();
    let payload = checkout_completed_event("cs_test_empty", Some("U1"), cart_metadata(" , ,"), 100);

    let (status, body) = deliver(&state, &payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing animation IDs");
    assert!(purchases_for_session(&state, "cs_test_empty").is_empty());
}

#[tokio::test]
async fn test_other_event_types_are_acknowledged_without_writes() {
    let state = test_state();
    let payload = json!({
        "id": "evt_other",
        "type": "payment_intent.succeeded",
        "data": {"object": {"id": "pi_1"}}
    })
    .to_string()
    .into_bytes();

    let (status, body) = deliver(&state, &payload).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"received": true}));
    let conn = state.db.get().unwrap();
    assert_eq!(queries::count_purchases(&conn).unwrap(), 0);
}

#[tokio::test]
async fn test_storage_failure_returns_server_error() {
    let state = test_state();
    {
        let conn = state.db.get().unwrap();
        conn.execute_batch("DROP TABLE purchases").unwrap();
    }
    let payload = checkout_completed_event("cs_test_dbfail", Some("U1"), single_metadata("A1", "Walk"), 100);

    let (status, body) = deliver(&state, &payload).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to record purchase");
}

// ============ Authentication ============

#[tokio::test]
async fn test_invalid_signature_writes_nothing() {
    let state = test_state();
    let payload = checkout_completed_event("cs_test_forged", Some("U1"), single_metadata("A1", "Walk"), 2999);
    let timestamp = current_timestamp();
    let forged = compute_stripe_signature(&payload, "whsec_wrong", &timestamp);
    let header = format!("t={},v1={}", timestamp, forged);

    let response = app(state.clone())
        .oneshot(webhook_request(&payload, Some(&header)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Webhook Error:"));
    assert!(purchases_for_session(&state, "cs_test_forged").is_empty());
}

#[tokio::test]
async fn test_payload_modified_after_signing_is_rejected() {
    let state = test_state();
    let signed = checkout_completed_event("cs_test_tamper", Some("U1"), single_metadata("A1", "Walk"), 2999);
    let header = stripe_signature_header(&signed);
    let tampered = checkout_completed_event("cs_test_tamper", Some("U2"), single_metadata("A1", "Walk"), 2999);

    let response = app(state.clone())
        .oneshot(webhook_request(&tampered, Some(&header)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(purchases_for_session(&state, "cs_test_tamper").is_empty());
}

#[tokio::test]
async fn test_missing_signature_header() {
    let state = test_state();
    let payload = checkout_completed_event("cs_test_nosig", Some("U1"), single_metadata("A1", "Walk"), 2999);

    let response = app(state.clone())
        .oneshot(webhook_request(&payload, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Webhook Error: Missing stripe-signature header");
}

#[tokio::test]
async fn test_signature_is_checked_before_payload_is_parsed() {
    let state = test_state();
    let response = app(state)
        .oneshot(webhook_request(b"not json", Some("t=1,v1=deadbeef")))
        .await
        .unwrap();

    // A stale signature on garbage must fail authentication, not parsing.
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Webhook Error:"));
}

#[tokio::test]
async fn test_non_post_is_method_not_allowed() {
    let state = test_state();
    let response = app(state)
        .oneshot(empty_request("GET", "/webhook/stripe"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Method not allowed");
}

// ============ Redelivery ============

/// Default mode: every delivery inserts. A redelivered event duplicates rows.
#[tokio::test]
async fn test_redelivery_duplicates_rows_without_unique_mode() {
    let state = test_state();
    let payload = checkout_completed_event("cs_test_twice", Some("U1"), single_metadata("A1", "Walk"), 2999);

    let (first, _) = deliver(&state, &payload).await;
    let (second, _) = deliver(&state, &payload).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(purchases_for_session(&state, "cs_test_twice").len(), 2);
}

#[tokio::test]
async fn test_redelivery_is_idempotent_in_unique_mode() {
    let state =
        create_test_app_state_with(UNREACHABLE_BASE, UNREACHABLE_BASE, PurchaseDedup::Unique);
    let payload = checkout_completed_event("cs_test_once", Some("U1"), cart_metadata("A1,A2"), 3000);

    let (first, _) = deliver(&state, &payload).await;
    let (second, body) = deliver(&state, &payload).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(body, json!({"received": true}));
    assert_eq!(purchases_for_session(&state, "cs_test_once").len(), 2);
}

#[tokio::test]
async fn test_repeated_cart_id_records_full_total_in_unique_mode() {
    let state =
        create_test_app_state_with(UNREACHABLE_BASE, UNREACHABLE_BASE, PurchaseDedup::Unique);
    let payload = checkout_completed_event("cs_test_repeat", Some("U1"), cart_metadata("A1,A1"), 3000);

    let (status, _) = deliver(&state, &payload).await;

    assert_eq!(status, StatusCode::OK);
    let rows = purchases_for_session(&state, "cs_test_repeat");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].amount_paid.to_string(), "30.00");
}

// ============ Business logic without HTTP ============

#[test]
fn test_process_checkout_writes_all_rows_in_one_batch() {
    let mut conn = setup_test_db();
    let data = CheckoutData {
        session_id: "cs_test_batch".into(),
        user_id: Some("U9".into()),
        metadata: [
            ("isCart".to_string(), "true".to_string()),
            ("animationIds".to_string(), "A1,A2,A3".to_string()),
        ]
        .into_iter()
        .collect(),
        amount_total: 4500,
    };

    let rows = purchases_for_checkout(&data, PurchaseDedup::AtLeastOnce).unwrap();
    let inserted = process_checkout(&mut conn, &rows, PurchaseDedup::AtLeastOnce).unwrap();

    assert_eq!(inserted, 3);
    let stored = queries::list_purchases_for_session(&conn, "cs_test_batch").unwrap();
    assert!(stored.iter().all(|r| r.amount_paid.to_string() == "15.00"));
}
