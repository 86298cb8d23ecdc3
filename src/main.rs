use dotenvy::dotenv;
use referral_engine::{
    api::{self, AppState},
    collab::{AllUsers, InMemoryOrders, RecordingCreditIssuer, RecordingNotifier},
    config,
    core::Engine,
    errors::Result,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (as early as possible)
    dotenv().ok(); // Non-fatal, env vars can be set externally
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = config::load_app_configuration()?;
    info!("Successfully processed application configuration.");

    // 4. Initialize database
    let db = config::database::create_connection().await?;
    config::database::create_tables(&db).await?;
    info!("Database initialized successfully.");

    // 5. Wire the engine against the standalone adapters. A storefront
    // deployment swaps these for adapters backed by its own order, user,
    // coupon, and mail systems.
    let engine = Arc::new(Engine::new(
        db.clone(),
        Arc::new(InMemoryOrders::new()),
        Arc::new(AllUsers),
        Arc::new(RecordingCreditIssuer::new()),
        Arc::new(RecordingNotifier::new()),
        app_config.rewards.clone(),
    ));

    // 6. Serve the API
    let app = api::router(AppState { db, engine });
    let listener = tokio::net::TcpListener::bind(&app_config.bind_addr).await?;
    info!(addr = %app_config.bind_addr, "Referral engine listening");
    axum::serve(listener, app).await?;

    Ok(())
}
