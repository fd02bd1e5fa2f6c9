//! Mocap Store - purchase fulfillment for a motion-capture animation storefront
//!
//! Three cooperating steps make up a sale: a checkout session is opened with the
//! payment provider, the provider's completion webhook records entitlements, and
//! the buyer's browser trades the paid session for signed download links.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod payments;
pub mod storage;
