use std::env;

use thiserror::Error;

use crate::db::PurchaseDedup;

const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_STORAGE_BUCKET: &str = "animations";
const DEFAULT_PRODUCT_IMAGE_URL: &str = "https://your-site.github.io/mocap/og-image.jpg";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Payment provider credentials.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    /// Overridable so tests can point the client at a mock server.
    pub api_base: String,
}

/// Object storage credentials for signing download URLs.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_url: String,
    pub service_key: String,
    pub bucket: String,
}

/// Fixed presentation of line items on the hosted checkout page.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub currency: String,
    pub product_description: String,
    pub product_image_url: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: "usd".to_string(),
            product_description: "Premium Motion Capture Animation".to_string(),
            product_image_url: DEFAULT_PRODUCT_IMAGE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub stripe: StripeConfig,
    pub storage: StorageConfig,
    pub checkout: CheckoutConfig,
    pub purchase_dedup: PurchaseDedup,
    pub dev_mode: bool,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("MOCAP_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match env::var("PORT") {
            Ok(p) => p.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: p,
            })?,
            Err(_) => 3000,
        };

        let purchase_dedup = match env::var("PURCHASE_DEDUP") {
            Ok(v) => v.parse().map_err(|_| ConfigError::Invalid {
                name: "PURCHASE_DEDUP",
                value: v,
            })?,
            Err(_) => PurchaseDedup::default(),
        };

        let stripe = StripeConfig {
            secret_key: required("STRIPE_SECRET_KEY")?,
            webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string()),
        };

        let storage = StorageConfig {
            base_url: required("SUPABASE_URL")?,
            service_key: required("SUPABASE_SERVICE_ROLE_KEY")?,
            bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| DEFAULT_STORAGE_BUCKET.to_string()),
        };

        let mut checkout = CheckoutConfig::default();
        if let Ok(url) = env::var("PRODUCT_IMAGE_URL") {
            checkout.product_image_url = url;
        }

        Ok(Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "mocap.db".to_string()),
            stripe,
            storage,
            checkout,
            purchase_dedup,
            dev_mode,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
