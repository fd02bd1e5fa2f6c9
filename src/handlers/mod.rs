pub mod public;
pub mod webhooks;

use axum::Router;

use crate::db::AppState;

/// Every route the service exposes, without state or tracing layers.
pub fn router() -> Router<AppState> {
    Router::new()
        // Storefront endpoints (CORS enabled)
        .merge(public::router())
        // Provider callbacks (signature auth)
        .merge(webhooks::router())
}
