use chrono::Duration;
use domain::store::MemoryStore;
use log::{error, info, warn};
use service::{config::Config, logging::Logger};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!("Starting notify_platform_rs [{:?}]...", config.runtime_env());

    if config.jwt_secret().is_none() {
        error!("JWT_SECRET must be set when running in production");
        std::process::exit(1);
    }

    let store = Arc::new(MemoryStore::new());
    if !config.is_production() {
        seed_development_data(&store, &config).await;
    }

    let app_state = web::AppState::new(config, store);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server failed: {e}");
        std::process::exit(1);
    }
}

async fn seed_development_data(store: &MemoryStore, config: &Config) {
    for user in store.seed_development_data().await {
        match domain::jwt::generate_access_token(config, user.id, &user.username, Duration::days(1))
        {
            Ok(token) => info!("Seeded user {} ({}), access token: {token}", user.id, user.username),
            Err(e) => warn!("Seeded user {} but could not issue a token: {e}", user.id),
        }
    }
}
