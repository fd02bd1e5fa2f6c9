use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mocap_store::config::Config;
use mocap_store::db::{AppState, PurchaseDedup, create_pool, enforce_unique_purchases, init_db};
use mocap_store::handlers;
use mocap_store::payments::StripeClient;
use mocap_store::storage::StorageClient;

#[derive(Parser, Debug)]
#[command(name = "mocap-store")]
#[command(about = "Checkout, payment confirmation and download links for a mocap storefront")]
struct Cli {
    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,

    /// Reject a second purchase row for the same session and animation,
    /// making webhook redelivery harmless. Overrides PURCHASE_DEDUP.
    #[arg(long)]
    enforce_unique_purchases: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mocap_store=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env().unwrap_or_else(|e| {
        tracing::error!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }
    if cli.enforce_unique_purchases {
        config.purchase_dedup = PurchaseDedup::Unique;
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
        if config.purchase_dedup == PurchaseDedup::Unique {
            enforce_unique_purchases(&conn).expect(
                "Failed to create unique purchase index (existing duplicate rows must be removed first)",
            );
            tracing::info!("Duplicate purchase rows will be rejected");
        } else {
            tracing::info!("Purchases recorded at least once per webhook delivery");
        }
    }

    let state = AppState {
        db: db_pool,
        stripe: StripeClient::new(&config.stripe),
        storage: StorageClient::new(&config.storage),
        checkout: config.checkout.clone(),
        purchase_dedup: config.purchase_dedup,
    };

    let app = handlers::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();
    if cli.ephemeral && !config.dev_mode {
        tracing::warn!("--ephemeral ignored: not in dev mode (set MOCAP_ENV=dev)");
    }
    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("Mocap store listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
