use crate::controller::ApiResponse;
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::params::notification::UpdateParams;
use crate::{AppState, Error};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::notification as NotificationApi;
use domain::notification::NotificationView;

use log::*;

/// GET all notifications received by the authenticated user, newest first.
#[utoipa::path(
    get,
    path = "/notifications",
    responses(
        (status = 200, description = "Successfully retrieved the caller's notifications", body = [NotificationView]),
        (status = 401, description = "Unauthorized"),
        (status = 405, description = "Method not allowed")
    ),
    security(
        ("bearer_auth" = []),
        ("cookie_auth" = [])
    )
)]
pub async fn index(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET all Notifications for user {user_id}");

    let notifications = NotificationApi::list_for_receiver(app_state.store_ref(), user_id).await?;

    debug!("Found {} Notifications", notifications.len());

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), notifications)))
}

/// PATCH the read state of a notification the authenticated user received.
#[utoipa::path(
    patch,
    path = "/notifications/{id}",
    params(
        ("id" = i32, Path, description = "Notification id to update")
    ),
    request_body = UpdateParams,
    responses(
        (status = 200, description = "Successfully updated the Notification", body = NotificationView),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Notification belongs to another user"),
        (status = 404, description = "Notification not found"),
        (status = 422, description = "Unprocessable Entity")
    ),
    security(
        ("bearer_auth" = []),
        ("cookie_auth" = [])
    )
)]
pub async fn update(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
    Json(params): Json<UpdateParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("PATCH Notification {id} for user {user_id} with: {params:?}");

    let notification =
        NotificationApi::update_read_state(app_state.store_ref(), user_id, id, params.is_read)
            .await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), notification)))
}
