use rust_decimal::Decimal;
use serde::Serialize;

/// A durable entitlement: `user_id` owns `animation_id`, paid through
/// checkout session `stripe_session_id`.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRecord {
    pub id: String,
    pub user_id: String,
    pub animation_id: String,
    pub stripe_session_id: String,
    pub amount_paid: Decimal,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPurchase {
    pub user_id: String,
    pub animation_id: String,
    pub stripe_session_id: String,
    pub amount_paid: Decimal,
}

/// Minor units (cents) to a two-decimal currency amount.
pub fn minor_to_amount(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// Even share of `total_minor` across `items` line items.
///
/// Uses integer division in minor units, so the shares may sum to slightly
/// less than the total. Callers guarantee `items > 0`.
pub fn split_amount(total_minor: i64, items: usize) -> Decimal {
    minor_to_amount(total_minor / items as i64)
}
