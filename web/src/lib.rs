use axum::http::{header, HeaderValue, Method};
use domain::store::NotificationStore;
use events::EventPublisher;
use log::*;
use service::config::Config;
use ::sse::domain_event_handler::SseDomainEventHandler;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub use self::error::{Error, Result};

mod controller;
mod error;
mod extractors;
mod middleware;
mod router;
mod params;
mod sse;

/// Everything a request handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn NotificationStore>,
    pub sse_manager: Arc<::sse::Manager>,
    pub event_publisher: EventPublisher,
}

impl AppState {
    /// Build the state with a fresh SSE manager wired to receive
    /// `NotificationRecorded` events.
    pub fn new(config: Config, store: Arc<dyn NotificationStore>) -> Self {
        let sse_manager = Arc::new(::sse::Manager::new());
        let event_publisher = EventPublisher::new()
            .with_handler(Arc::new(SseDomainEventHandler::new(Arc::clone(&sse_manager))));

        Self {
            config,
            store,
            sse_manager,
            event_publisher,
        }
    }

    pub fn store_ref(&self) -> &dyn NotificationStore {
        self.store.as_ref()
    }
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let bind_address = app_state.config.bind_address();
    let sse_manager = Arc::clone(&app_state.sse_manager);

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::PATCH, Method::OPTIONS])
        .allow_credentials(true)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(allowed_origins(&app_state.config));

    let router = router::define_routes(app_state).layer(cors_layer);

    let listener = TcpListener::bind(&bind_address).await?;
    info!("Server starting... listening for connections on http://{bind_address}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown signal received, closing notification streams");
            // Open streams never finish on their own; end them so the
            // graceful shutdown can complete.
            sse_manager.shutdown();
        })
        .await
}

fn allowed_origins(config: &Config) -> Vec<HeaderValue> {
    config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin:?}: {e}");
                None
            }
        })
        .collect()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::Duration;
    use domain::store::{MemoryStore, RowStatus, User};

    pub(crate) const SECRET: &str = "test-secret";

    pub(crate) async fn app_state_with_users(users: &[(i32, &str)]) -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        for (id, name) in users {
            store
                .upsert_user(User {
                    id: *id,
                    username: name.to_string(),
                    nickname: String::new(),
                    row_status: RowStatus::Normal,
                })
                .await;
        }
        let config = Config::from_defaults().set_jwt_secret(SECRET);
        (AppState::new(config, store.clone()), store)
    }

    pub(crate) fn token_for(state: &AppState, user_id: i32) -> String {
        domain::jwt::generate_access_token(&state.config, user_id, "user", Duration::hours(1))
            .unwrap()
    }
}
