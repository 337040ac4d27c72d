use crate::{
    controller::health_check_controller, middleware::auth::require_auth, params, sse, AppState,
};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch},
    Router,
};

use crate::controller::notification_controller;

use service::config::ACCESS_TOKEN_COOKIE_NAME;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Notify Platform API"
        ),
        paths(
            health_check_controller::health_check,
            notification_controller::index,
            notification_controller::update,
            sse::handler::notification_stream_handler,
        ),
        components(
            schemas(
                domain::notification::NotificationView,
                domain::notification::NotificationPayload,
                domain::notification::MemoCommentPayload,
                domain::notification::TicketCommentPayload,
                params::notification::UpdateParams,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "notify_platform", description = "Inbox and live notification stream API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Access tokens are accepted either as a bearer token or from the access token cookie.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    ACCESS_TOKEN_COOKIE_NAME,
                    "Access token JWT, same value as the bearer token",
                ))),
            );
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(notification_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn notification_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/notifications", get(notification_controller::index))
        .route("/notifications/:id", patch(notification_controller::update))
        .route(
            "/notifications/stream",
            get(sse::handler::notification_stream_handler),
        )
        .route_layer(from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state)
}
