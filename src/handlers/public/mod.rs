mod cart;
mod checkout;
mod custom_requests;
mod download;
mod purchases;

pub use cart::*;
pub use checkout::*;
pub use custom_requests::*;
pub use download::*;
pub use purchases::*;

use axum::{
    Json, Router,
    http::{HeaderName, Method, header},
    routing::{delete, get, post},
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// The storefront is a static site that may be served from anywhere.
///
/// The layer answers every `OPTIONS` request itself, so routes only
/// register their real methods.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/create-checkout", post(create_checkout))
        .route("/get-download", post(get_download))
        .route("/custom-requests", post(submit_custom_request))
        .route(
            "/users/{user_id}/cart",
            get(list_cart).post(add_to_cart).delete(clear_cart),
        )
        .route("/users/{user_id}/cart/{animation_id}", delete(remove_from_cart))
        .route("/users/{user_id}/purchases", get(list_purchases))
        .layer(cors_layer())
}
