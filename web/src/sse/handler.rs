use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::AppState;
use ::sse::connection::{StreamConnection, CONNECTION_BUFFER};
use ::sse::message::Frame;
use ::sse::Manager;
use async_stream::stream;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use domain::UserId;
use futures::{Stream, StreamExt};
use log::*;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Opens the live notification stream for the authenticated user.
///
/// The connection is registered before the response is returned, so
/// notifications recorded from this point on are delivered. The stream stays
/// open until the client goes away or the server shuts down.
#[utoipa::path(
    get,
    path = "/notifications/stream",
    responses(
        (status = 200, description = "Event stream of Datastar patch frames", body = String, content_type = "text/event-stream"),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("bearer_auth" = []),
        ("cookie_auth" = [])
    )
)]
pub(crate) async fn notification_stream_handler(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("Establishing SSE notification stream for user {user_id}");

    let frames = frame_stream(Arc::clone(&app_state.sse_manager), user_id);
    let keep_alive =
        KeepAlive::new().interval(Duration::from_secs(app_state.config.sse_keep_alive_secs));

    Sse::new(frames.map(|frame| Ok(frame.into_event()))).keep_alive(keep_alive)
}

/// Removes the connection from the registry when the stream is dropped,
/// whether it ran to completion or the client disconnected mid-stream.
struct ConnectionGuard {
    manager: Arc<Manager>,
    connection: Arc<StreamConnection>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        debug!(
            "SSE stream {} for user {} ended, cleaning up",
            self.connection.id(),
            self.connection.owner()
        );
        self.manager.unregister_connection(&self.connection);
    }
}

/// Registers a connection for `user_id` and yields every frame pushed to it,
/// starting with the `sseConnected` handshake signal.
pub(crate) fn frame_stream(manager: Arc<Manager>, user_id: UserId) -> impl Stream<Item = Frame> {
    let (tx, mut rx) = mpsc::channel(CONNECTION_BUFFER);
    let connection = manager.register_connection(user_id, tx);
    let shutdown = manager.shutdown_token();

    let handshake = Frame::signals([
        ("sseConnected", Value::Bool(true)),
        ("hasNewNotification", Value::Bool(false)),
    ]);
    if let Err(e) = connection.push(handshake) {
        warn!("Failed to queue handshake for {}: {e}", connection.id());
    }

    let guard = ConnectionGuard {
        manager,
        connection,
    };

    stream! {
        let guard = guard;
        loop {
            let next = tokio::select! {
                frame = rx.recv() => frame,
                _ = guard.connection.closed() => None,
                _ = shutdown.cancelled() => None,
            };

            match next {
                Some(frame) => yield frame,
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::sse::message::{NOTIFICATION_LIST_SELECTOR, TOAST_CONTAINER_SELECTOR};
    use chrono::{TimeZone, Utc};
    use events::{NotificationEvent, NotificationKind};
    use futures::pin_mut;

    fn handshake() -> Frame {
        Frame::signals([
            ("sseConnected", Value::Bool(true)),
            ("hasNewNotification", Value::Bool(false)),
        ])
    }

    fn memo_comment(id: i32) -> NotificationEvent {
        NotificationEvent {
            id,
            kind: NotificationKind::MemoComment,
            sender_display_name: "Ann".to_string(),
            sender_id: 2,
            related_memo: Some("memos/abc".to_string()),
            ticket_id: None,
            ticket_name: None,
            snippet: None,
            occurred_at: Utc.with_ymd_and_hms(2024, 5, 1, 15, 4, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn first_frame_is_the_handshake_signal() {
        let manager = Arc::new(Manager::new());
        let frames = frame_stream(Arc::clone(&manager), 1);
        pin_mut!(frames);

        assert_eq!(frames.next().await, Some(handshake()));
        assert_eq!(manager.connection_count_for(1), 1);
    }

    #[tokio::test]
    async fn dropping_the_stream_unregisters_the_connection() {
        let manager = Arc::new(Manager::new());
        let frames = frame_stream(Arc::clone(&manager), 1);
        assert_eq!(manager.connection_count_for(1), 1);

        drop(frames);

        assert_eq!(manager.connection_count_for(1), 0);
        assert_eq!(manager.total_connections(), 0);
    }

    #[tokio::test]
    async fn notifications_arrive_in_dispatch_order() {
        let manager = Arc::new(Manager::new());
        let frames = frame_stream(Arc::clone(&manager), 1);
        pin_mut!(frames);
        assert_eq!(frames.next().await, Some(handshake()));

        assert_eq!(manager.notify_user(1, &memo_comment(9)), 1);

        match frames.next().await {
            Some(Frame::PatchElements { selector, .. }) => {
                assert_eq!(selector, NOTIFICATION_LIST_SELECTOR)
            }
            other => panic!("expected list patch, got {other:?}"),
        }
        match frames.next().await {
            Some(Frame::PatchElements { selector, .. }) => {
                assert_eq!(selector, TOAST_CONTAINER_SELECTOR)
            }
            other => panic!("expected toast patch, got {other:?}"),
        }
        assert_eq!(
            frames.next().await,
            Some(Frame::signals([("hasNewNotification", Value::Bool(true))]))
        );
    }

    #[tokio::test]
    async fn shutdown_ends_the_stream() {
        let manager = Arc::new(Manager::new());
        let frames = frame_stream(Arc::clone(&manager), 1);
        pin_mut!(frames);
        assert_eq!(frames.next().await, Some(handshake()));

        manager.shutdown();

        assert_eq!(frames.next().await, None);
        assert_eq!(manager.total_connections(), 0);
    }

    #[tokio::test]
    async fn other_users_streams_are_untouched() {
        let manager = Arc::new(Manager::new());
        let ann = frame_stream(Arc::clone(&manager), 1);
        let bo = frame_stream(Arc::clone(&manager), 2);
        pin_mut!(ann);
        pin_mut!(bo);
        assert_eq!(ann.next().await, Some(handshake()));
        assert_eq!(bo.next().await, Some(handshake()));

        manager.notify_user(1, &memo_comment(1));

        let pending = tokio::time::timeout(Duration::from_millis(50), bo.next()).await;
        assert!(pending.is_err(), "user 2 must not receive user 1's frames");
        assert!(matches!(ann.next().await, Some(Frame::PatchElements { .. })));
    }
}
