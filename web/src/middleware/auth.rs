use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::{AppState, Error};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use log::*;
use service::config::ACCESS_TOKEN_COOKIE_NAME;

/// Authentication middleware that returns 401 Unauthorized unless the request
/// carries a valid access token for an active user.
///
/// On success the resolved user id is stored in the request extensions for the
/// `AuthenticatedUser` extractor.
pub async fn require_auth(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = access_token(request.headers()) else {
        debug!("Rejecting {} without an access token", request.uri().path());
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    };

    match domain::jwt::authenticate(app_state.store_ref(), &app_state.config, &token).await {
        Ok(user_id) => {
            trace!("Authenticated user {user_id} for {}", request.uri().path());
            request
                .extensions_mut()
                .insert(AuthenticatedUser(user_id));
            next.run(request).await
        }
        Err(e) => Error::from(e).into_response(),
    }
}

/// The bearer token from the Authorization header wins over the cookie. A
/// present but non-bearer Authorization header yields no token at all.
fn access_token(headers: &HeaderMap) -> Option<String> {
    if headers.contains_key(AUTHORIZATION) {
        return headers
            .typed_get::<Authorization<Bearer>>()
            .map(|authorization| authorization.token().to_string());
    }

    CookieJar::from_headers(headers)
        .get(ACCESS_TOKEN_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}
