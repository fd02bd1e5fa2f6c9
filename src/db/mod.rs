mod from_row;
pub mod queries;
mod schema;

pub use schema::{enforce_unique_purchases, init_db};

use std::str::FromStr;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::CheckoutConfig;
use crate::payments::StripeClient;
use crate::storage::StorageClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// How redelivered `checkout.session.completed` events are treated.
///
/// Webhooks are delivered at least once. With `AtLeastOnce` every delivery
/// inserts its rows; with `Unique` the store rejects a second row for the same
/// `(stripe_session_id, animation_id)` pair and the insert is skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PurchaseDedup {
    #[default]
    AtLeastOnce,
    Unique,
}

impl FromStr for PurchaseDedup {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "at-least-once" | "at_least_once" | "none" | "off" => Ok(PurchaseDedup::AtLeastOnce),
            "unique" | "on" => Ok(PurchaseDedup::Unique),
            _ => Err(()),
        }
    }
}

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Entitlement store (purchases, carts, custom requests)
    pub db: DbPool,
    pub stripe: StripeClient,
    pub storage: StorageClient,
    pub checkout: CheckoutConfig,
    pub purchase_dedup: PurchaseDedup,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
