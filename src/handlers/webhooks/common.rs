//! Provider-agnostic webhook handling.
//!
//! A [`WebhookProvider`] knows how to authenticate and decode its own
//! deliveries; everything after that (turning a completed checkout into
//! purchase rows) lives here.

use std::collections::{HashMap, HashSet};

use axum::{body::Bytes, http::HeaderMap};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::{AppState, PurchaseDedup, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::models::{NewPurchase, SessionMetadata, minor_to_amount, split_amount};

/// Body returned for every accepted delivery.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}

/// Data extracted from a checkout completion event.
#[derive(Debug, Clone)]
pub struct CheckoutData {
    pub session_id: String,
    /// Purchasing user; `None` for guest checkouts.
    pub user_id: Option<String>,
    pub metadata: HashMap<String, String>,
    /// Minor currency units; missing totals are treated as zero.
    pub amount_total: i64,
}

#[derive(Debug)]
pub enum WebhookEvent {
    CheckoutCompleted(CheckoutData),
    /// Any other event type. Acknowledged and otherwise ignored.
    Ignored(String),
}

pub trait WebhookProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    fn extract_signature(&self, headers: &HeaderMap) -> Result<String>;

    /// `Ok(false)` means a well-formed signature that does not match.
    fn verify_signature(&self, state: &AppState, body: &Bytes, signature: &str) -> Result<bool>;

    fn parse_event(&self, body: &Bytes) -> Result<WebhookEvent>;
}

/// Authenticate, decode and apply one delivery.
///
/// The signature is checked against the raw bytes before anything in the
/// payload is trusted.
pub async fn handle_webhook<P: WebhookProvider>(
    provider: &P,
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<WebhookAck> {
    let signature = provider.extract_signature(headers)?;

    match provider.verify_signature(state, body, &signature) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(provider = provider.provider_name(), "Webhook signature mismatch");
            return Err(AppError::InvalidSignature(msg::SIGNATURE_MISMATCH.into()));
        }
        Err(e) => {
            tracing::warn!(provider = provider.provider_name(), "Webhook rejected: {}", e);
            return Err(e);
        }
    }

    match provider.parse_event(body)? {
        WebhookEvent::CheckoutCompleted(data) => {
            let span = tracing::info_span!("checkout_completed", session_id = %data.session_id);
            span.in_scope(|| fulfill_checkout(state, &data))?;
        }
        WebhookEvent::Ignored(event_type) => {
            tracing::debug!(
                provider = provider.provider_name(),
                event_type,
                "Ignoring webhook event"
            );
        }
    }

    Ok(WebhookAck::received())
}

fn fulfill_checkout(state: &AppState, data: &CheckoutData) -> Result<usize> {
    let purchases = purchases_for_checkout(data, state.purchase_dedup)?;
    let mut conn = state.db.get().map_err(|e| {
        tracing::error!("DB connection error: {}", e);
        AppError::Persistence(msg::PURCHASE_RECORD_FAILED.into())
    })?;
    process_checkout(&mut conn, &purchases, state.purchase_dedup)
}

/// The purchase rows one completed checkout entitles.
///
/// Checks run in a fixed order: user first, then metadata. Cart sessions
/// split `amount_total` evenly across the listed animations. Under
/// [`PurchaseDedup::Unique`] a repeated id is listed once, so the split only
/// covers rows the store will keep.
pub fn purchases_for_checkout(
    data: &CheckoutData,
    dedup: PurchaseDedup,
) -> Result<Vec<NewPurchase>> {
    let user_id = data
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .or_bad_request(msg::MISSING_USER_ID)
        .inspect_err(|_| tracing::warn!("Checkout completed without a user reference"))?;

    let metadata = SessionMetadata::parse(&data.metadata).map_err(|e| {
        tracing::warn!("Checkout metadata rejected: {}", e);
        AppError::from(e)
    })?;

    let mut ids = metadata.animation_ids();
    if dedup == PurchaseDedup::Unique {
        let mut seen = HashSet::new();
        ids.retain(|id| seen.insert(*id));
    }
    let amount_paid = if metadata.is_cart() {
        split_amount(data.amount_total, ids.len())
    } else {
        minor_to_amount(data.amount_total)
    };

    Ok(ids
        .into_iter()
        .map(|animation_id| NewPurchase {
            user_id: user_id.to_string(),
            animation_id: animation_id.to_string(),
            stripe_session_id: data.session_id.clone(),
            amount_paid,
        })
        .collect())
}

/// Write the rows for one checkout in a single transaction.
///
/// Storage failures are reported as a retryable server error so the
/// provider redelivers the event.
pub fn process_checkout(
    conn: &mut Connection,
    purchases: &[NewPurchase],
    dedup: PurchaseDedup,
) -> Result<usize> {
    let inserted = queries::insert_purchases(conn, purchases, dedup).map_err(|e| {
        tracing::error!("Failed to record purchases: {}", e);
        AppError::Persistence(msg::PURCHASE_RECORD_FAILED.into())
    })?;

    if inserted < purchases.len() {
        tracing::info!(
            inserted,
            skipped = purchases.len() - inserted,
            "Duplicate delivery, existing purchases kept"
        );
    } else {
        tracing::info!(inserted, "Purchases recorded");
    }

    Ok(inserted)
}
