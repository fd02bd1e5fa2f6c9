use axum::{body::Bytes, extract::State, http::HeaderMap};

use crate::db::AppState;
use crate::error::{AppError, Result, msg};
use crate::extractors::Json;
use crate::payments::{StripeCheckoutSession, StripeWebhookEvent};

use super::common::{CheckoutData, WebhookAck, WebhookEvent, WebhookProvider, handle_webhook};

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

pub struct StripeWebhookProvider;

impl WebhookProvider for StripeWebhookProvider {
    fn provider_name(&self) -> &'static str {
        "stripe"
    }

    fn extract_signature(&self, headers: &HeaderMap) -> Result<String> {
        headers
            .get("stripe-signature")
            .ok_or_else(|| AppError::InvalidSignature(msg::MISSING_SIGNATURE_HEADER.into()))?
            .to_str()
            .map(String::from)
            .map_err(|_| AppError::InvalidSignature(msg::INVALID_SIGNATURE_HEADER.into()))
    }

    fn verify_signature(&self, state: &AppState, body: &Bytes, signature: &str) -> Result<bool> {
        state.stripe.verify_webhook_signature(body, signature)
    }

    fn parse_event(&self, body: &Bytes) -> Result<WebhookEvent> {
        let event: StripeWebhookEvent = serde_json::from_slice(body).map_err(|e| {
            tracing::warn!("Failed to parse Stripe webhook: {}", e);
            AppError::BadRequest(msg::INVALID_EVENT.into())
        })?;

        if event.event_type != CHECKOUT_SESSION_COMPLETED {
            return Ok(WebhookEvent::Ignored(event.event_type));
        }

        let session: StripeCheckoutSession =
            serde_json::from_value(event.data.object).map_err(|e| {
                tracing::warn!("Failed to parse checkout session: {}", e);
                AppError::BadRequest(msg::INVALID_CHECKOUT_SESSION.into())
            })?;

        tracing::debug!(
            event_id = event.id.as_deref().unwrap_or("-"),
            session_id = %session.id,
            payment_status = ?session.payment_status,
            "Stripe checkout completed"
        );

        Ok(WebhookEvent::CheckoutCompleted(CheckoutData {
            session_id: session.id,
            user_id: session.client_reference_id,
            metadata: session.metadata,
            amount_total: session.amount_total.unwrap_or(0),
        }))
    }
}

pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    handle_webhook(&StripeWebhookProvider, &state, &headers, &body)
        .await
        .map(Json)
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
