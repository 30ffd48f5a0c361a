// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use chess_club::config::Config;
use chess_club::identity::{HttpIdentityProvider, IdentityProvider};
use chess_club::models::user::Role;
use chess_club::notify::{ExpoNotifier, LogNotifier, Notifier};
use chess_club::routes;
use chess_club::state::AppState;
use chess_club::store::{ClubStore, PgStore};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (.env included)
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to connect to database after 5 retries: {}", e);
                    return Err(e.into());
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    let store = PgStore::new(pool);

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    store.run_migrations().await?;
    tracing::info!("Migrations applied successfully.");

    let store: Arc<dyn ClubStore> = Arc::new(store);

    if let Err(e) = seed_owner(&*store, &config).await {
        tracing::error!("Failed to seed owner: {}", e);
    }

    let identity: Arc<dyn IdentityProvider> =
        Arc::new(HttpIdentityProvider::new(config.identity_url.clone()));

    let notifier: Arc<dyn Notifier> = match &config.push_url {
        Some(url) => Arc::new(ExpoNotifier::new(url.clone())),
        None => {
            tracing::info!("PUSH_URL not set, push notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let addr = config.bind_address;
    let state = AppState::new(store, identity, notifier, config);

    // Create the Axum application router
    let app = routes::create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start the server
    axum::serve(listener, app).await?;

    Ok(())
}

/// Promotes the configured owner if that user has already signed in once.
/// First-time owners are promoted on login instead.
async fn seed_owner(store: &dyn ClubStore, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(email) = &config.owner_email {
        match store.set_role_by_email(email, Role::Owner).await? {
            Some(user) => tracing::info!("Owner role ensured for {}", user.user_id),
            None => tracing::info!("Owner {} has not signed in yet", email),
        }
    }
    Ok(())
}
