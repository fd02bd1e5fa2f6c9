use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::{OptionExt, Result, msg};
use crate::extractors::Json;
use crate::models::{IntentLine, PurchaseIntent};
use crate::payments::checkout_session_form;

/// Checkout request as sent by the storefront: either a single animation or
/// a cart. A non-empty `cartItems` wins over the single-item fields.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    #[serde(default)]
    pub animation_id: Option<String>,
    #[serde(default)]
    pub animation_title: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub cart_items: Option<Vec<CheckoutCartItem>>,
    /// Purchasing user, forwarded to the provider as `client_reference_id`.
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCartItem {
    #[serde(default)]
    pub animation_id: Option<String>,
    #[serde(default)]
    pub animation_title: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutResponse {
    pub session_id: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CreateCheckoutRequest {
    /// Every line needs an animation id: without it the purchase cannot be
    /// recorded later. Title and price are left for the provider to validate.
    pub fn into_intent(self) -> Result<PurchaseIntent> {
        let cart = self
            .cart_items
            .unwrap_or_default()
            .into_iter()
            .map(|item| {
                Ok(IntentLine {
                    animation_id: non_blank(item.animation_id)
                        .or_bad_request(msg::MISSING_ANIMATION_ID)?,
                    title: item.animation_title,
                    unit_price: item.price,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let single = if cart.is_empty() {
            Some(IntentLine {
                animation_id: non_blank(self.animation_id)
                    .or_bad_request(msg::MISSING_ANIMATION_ID)?,
                title: self.animation_title,
                unit_price: self.price,
            })
        } else {
            None
        };

        PurchaseIntent::select(single, cart).or_bad_request(msg::MISSING_ANIMATION_ID)
    }
}

/// The storefront origin, used to build the redirect URLs.
fn request_origin(headers: &HeaderMap) -> Option<String> {
    headers
        .get("origin")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|o| !o.is_empty() && *o != "null")
        .map(String::from)
}

pub async fn create_checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>> {
    let origin = request_origin(&headers).or_bad_request("Missing Origin header")?;
    let user_id = non_blank(request.user_id.clone());
    let intent = request.into_intent()?;

    let form = checkout_session_form(&intent, &state.checkout, user_id.as_deref(), &origin)?;
    let session = state
        .stripe
        .create_checkout_session(&form)
        .await
        .inspect_err(|e| tracing::warn!("Error creating checkout session: {}", e))?;

    tracing::info!(
        session_id = %session.id,
        items = intent.lines().len(),
        guest = user_id.is_none(),
        "Checkout session created"
    );

    Ok(Json(CreateCheckoutResponse {
        session_id: session.id,
    }))
}
