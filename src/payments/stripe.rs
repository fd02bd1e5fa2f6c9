use std::collections::HashMap;

use hmac::{Hmac, Mac};
use reqwest::{Client, Response};
use serde::{Deserialize, Deserializer};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::{CheckoutConfig, StripeConfig};
use crate::error::{AppError, Result, msg};
use crate::models::{MetadataError, PurchaseIntent, SessionMetadata};

type HmacSha256 = Hmac<Sha256>;

/// Stripe substitutes the real session id into the success URL.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    webhook_secret: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: Client::new(),
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Create a hosted checkout session from form parameters built by
    /// [`checkout_session_form`].
    pub async fn create_checkout_session(
        &self,
        form: &[(String, String)],
    ) -> Result<StripeCheckoutSession> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Stripe response: {}", e)))
    }

    /// Fetch a checkout session straight from Stripe.
    pub async fn retrieve_checkout_session(&self, session_id: &str) -> Result<StripeCheckoutSession> {
        if !is_valid_session_id(session_id) {
            return Err(AppError::BadRequest("Invalid session ID".into()));
        }

        let response = self
            .client
            .get(format!("{}/v1/checkout/sessions/{}", self.api_base, session_id))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Stripe response: {}", e)))
    }

    /// Maximum age of a webhook timestamp before it's rejected (in seconds).
    /// Stripe recommends 300 seconds (5 minutes).
    const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

    /// Allowed clock skew for timestamps from the future.
    const WEBHOOK_FUTURE_SKEW_SECS: i64 = 60;

    /// Verify a `stripe-signature` header against the raw request body.
    ///
    /// Returns `Err` for a malformed header and `Ok(false)` for a well-formed
    /// header that does not authenticate the payload.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        // Stripe signature format: t=timestamp,v1=signature[,v1=signature...]
        let mut timestamp = None;
        let mut candidates = Vec::new();

        for part in signature.split(',') {
            let part = part.trim();
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(s) = part.strip_prefix("v1=") {
                candidates.push(s);
            }
        }

        let timestamp_str = timestamp
            .ok_or_else(|| AppError::InvalidSignature(msg::INVALID_SIGNATURE_FORMAT.into()))?;
        if candidates.is_empty() {
            return Err(AppError::InvalidSignature(msg::INVALID_SIGNATURE_FORMAT.into()));
        }

        let timestamp: i64 = timestamp_str
            .parse()
            .map_err(|_| AppError::InvalidSignature(msg::INVALID_TIMESTAMP_IN_SIGNATURE.into()))?;

        let age = chrono::Utc::now().timestamp() - timestamp;
        if age > Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS {
            tracing::warn!(
                age,
                max = Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS,
                "Stripe webhook rejected: timestamp too old"
            );
            return Ok(false);
        }
        if age < -Self::WEBHOOK_FUTURE_SKEW_SECS {
            tracing::warn!(age, "Stripe webhook rejected: timestamp in the future");
            return Ok(false);
        }

        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal(msg::INVALID_WEBHOOK_SECRET.into()))?;
        mac.update(timestamp_str.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());
        let expected_bytes = expected.as_bytes();

        // Signature length is not secret (always 64 hex chars), so the length
        // check may short-circuit; the byte comparison must not.
        let matched = candidates.iter().any(|candidate| {
            let provided = candidate.as_bytes();
            provided.len() == expected_bytes.len() && bool::from(expected_bytes.ct_eq(provided))
        });

        Ok(matched)
    }
}

/// Stripe ids are ASCII alphanumerics and underscores.
fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 255 && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

/// Surface Stripe's own message so the buyer sees why checkout failed.
async fn upstream_error(response: Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<StripeErrorBody>(&body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or_else(|| format!("Stripe API error (HTTP {})", status.as_u16()));
    tracing::warn!(status = status.as_u16(), "Stripe request failed: {}", message);
    AppError::Upstream(message)
}

/// Form parameters for `POST /v1/checkout/sessions`.
///
/// One `price_data` line item per animation with quantity 1, card payments,
/// `payment` mode, redirects back to `origin`, and the purchase encoded in
/// session metadata.
pub fn checkout_session_form(
    intent: &PurchaseIntent,
    checkout: &CheckoutConfig,
    client_reference_id: Option<&str>,
    origin: &str,
) -> Result<Vec<(String, String)>> {
    let origin = origin.trim_end_matches('/');
    let mut form: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("payment_method_types[0]".into(), "card".into()),
        (
            "success_url".into(),
            format!("{}/thank-you.html?session_id={}", origin, SESSION_ID_PLACEHOLDER),
        ),
        ("cancel_url".into(), format!("{}/index.html", origin)),
    ];

    if let Some(user_id) = client_reference_id {
        form.push(("client_reference_id".into(), user_id.to_string()));
    }

    for (i, line) in intent.lines().iter().enumerate() {
        let prefix = format!("line_items[{}]", i);
        form.push((
            format!("{}[price_data][currency]", prefix),
            checkout.currency.clone(),
        ));
        if let Some(title) = &line.title {
            form.push((
                format!("{}[price_data][product_data][name]", prefix),
                title.clone(),
            ));
        }
        form.push((
            format!("{}[price_data][product_data][description]", prefix),
            checkout.product_description.clone(),
        ));
        form.push((
            format!("{}[price_data][product_data][images][0]", prefix),
            checkout.product_image_url.clone(),
        ));
        if let Some(amount) = line.unit_amount() {
            form.push((
                format!("{}[price_data][unit_amount]", prefix),
                amount.to_string(),
            ));
        }
        form.push((format!("{}[quantity]", prefix), "1".into()));
    }

    for (key, value) in intent.metadata().to_pairs()? {
        form.push((format!("metadata[{}]", key), value));
    }

    Ok(form)
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    NoPaymentRequired,
}

/// The parts of a Stripe checkout session this service reads.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    /// The purchasing user; absent for guest checkouts.
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: HashMap<String, String>,
    /// Minor currency units.
    #[serde(default)]
    pub amount_total: Option<i64>,
    pub payment_status: PaymentStatus,
}

impl StripeCheckoutSession {
    pub fn parsed_metadata(&self) -> std::result::Result<SessionMetadata, MetadataError> {
        SessionMetadata::parse(&self.metadata)
    }
}

/// Generic Stripe webhook event - object is parsed based on event_type
#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}
