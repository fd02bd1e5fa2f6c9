use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::{AppError, OptionExt, Result, msg};
use crate::extractors::Json;
use crate::models::minor_to_amount;
use crate::payments::PaymentStatus;

/// Length of the order reference shown to the buyer.
const ORDER_ID_LEN: usize = 16;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDownloadRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub order_id: String,
    pub animation_title: Option<String>,
    /// Two decimal places, e.g. `"29.99"`.
    pub amount: String,
    /// Date of issuance, `YYYY-MM-DD`.
    pub date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLink {
    pub animation_id: String,
    pub download_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDownloadResponse {
    /// First purchased item's link.
    pub download_url: String,
    pub order_details: OrderDetails,
    /// Every item's link; only present for cart purchases.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub downloads: Vec<DownloadLink>,
}

pub fn order_id(session_id: &str) -> String {
    session_id.chars().take(ORDER_ID_LEN).collect()
}

/// Mint download links for a checkout session.
///
/// Payment status comes from the provider on every call, never from local
/// state, and nothing is signed unless that status is `paid`.
pub async fn get_download(
    State(state): State<AppState>,
    Json(request): Json<GetDownloadRequest>,
) -> Result<Json<GetDownloadResponse>> {
    let session_id = request
        .session_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_bad_request(msg::SESSION_ID_REQUIRED)?;

    let session = state.stripe.retrieve_checkout_session(&session_id).await?;
    if session.payment_status != PaymentStatus::Paid {
        tracing::warn!(
            session_id = %session.id,
            payment_status = ?session.payment_status,
            "Download requested for unpaid session"
        );
        return Err(AppError::BadRequest(msg::PAYMENT_NOT_COMPLETED.into()));
    }

    let metadata = session.parsed_metadata().map_err(|e| {
        tracing::warn!(session_id = %session.id, "Session metadata rejected: {}", e);
        AppError::from(e)
    })?;

    let mut downloads = Vec::new();
    for animation_id in metadata.animation_ids() {
        let grant = state.storage.sign_download(animation_id).await.map_err(|e| {
            tracing::error!(
                session_id = %session.id,
                animation_id,
                "Failed to sign download: {}",
                e
            );
            AppError::BadRequest(msg::DOWNLOAD_LINK_FAILED.into())
        })?;
        downloads.push(DownloadLink {
            animation_id: animation_id.to_string(),
            download_url: grant.url,
            expires_at: grant.expires_at,
        });
    }

    let download_url = downloads
        .first()
        .map(|d| d.download_url.clone())
        .or_bad_request(msg::MISSING_ANIMATION_ID)?;

    tracing::info!(
        session_id = %session.id,
        items = downloads.len(),
        "Download links issued"
    );

    if !metadata.is_cart() {
        downloads.clear();
    }

    Ok(Json(GetDownloadResponse {
        download_url,
        order_details: OrderDetails {
            order_id: order_id(&session.id),
            animation_title: metadata.animation_title().map(String::from),
            amount: format!("{:.2}", minor_to_amount(session.amount_total.unwrap_or(0))),
            date: Utc::now().format("%Y-%m-%d").to_string(),
        },
        downloads,
    }))
}
