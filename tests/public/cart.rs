//! Per-user cart endpoints

#[path = "../common/mod.rs"]
mod common;

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use common::*;

fn test_state() -> AppState {
    create_test_app_state(UNREACHABLE_BASE, UNREACHABLE_BASE)
}

async fn add(state: &AppState, user: &str, animation_id: &str) -> (StatusCode, serde_json::Value) {
    let response = app(state.clone())
        .oneshot(json_request(
            "POST",
            &format!("/users/{}/cart", user),
            json!({"animationId": animation_id}),
        ))
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

#[tokio::test]
async fn test_add_then_list() {
    let state = test_state();

    let (status, body) = add(&state, "U1", "A1").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"added": true}));
    add(&state, "U1", "A2").await;

    let response = app(state.clone())
        .oneshot(empty_request("GET", "/users/U1/cart"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let ids: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["animation_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["A1", "A2"]);
}

#[tokio::test]
async fn test_adding_twice_keeps_one_entry() {
    let state = test_state();

    add(&state, "U1", "A1").await;
    let (status, body) = add(&state, "U1", "A1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"added": false}));
    let conn = state.db.get().unwrap();
    assert_eq!(queries::list_cart_items(&conn, "U1").unwrap().len(), 1);
}

#[tokio::test]
async fn test_carts_are_per_user() {
    let state = test_state();
    add(&state, "U1", "A1").await;

    let response = app(state.clone())
        .oneshot(empty_request("GET", "/users/U2/cart"))
        .await
        .unwrap();

    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_remove_item() {
    let state = test_state();
    add(&state, "U1", "A1").await;

    let response = app(state.clone())
        .oneshot(empty_request("DELETE", "/users/U1/cart/A1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app(state.clone())
        .oneshot(empty_request("DELETE", "/users/U1/cart/A1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Item not in cart");
}

#[tokio::test]
async fn test_blank_animation_id_is_rejected() {
    let state = test_state();
    let (status, body) = add(&state, "U1", "  ").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "animationId is required");
}

#[tokio::test]
async fn test_clear_cart() {
    let state = test_state();
    add(&state, "U1", "A1").await;
    add(&state, "U1", "A2").await;
    add(&state, "U2", "A1").await;

    let response = app(state.clone())
        .oneshot(empty_request("DELETE", "/users/U1/cart"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"removed": 2}));
    let conn = state.db.get().unwrap();
    assert!(queries::list_cart_items(&conn, "U1").unwrap().is_empty());
    assert_eq!(queries::list_cart_items(&conn, "U2").unwrap().len(), 1);
}
