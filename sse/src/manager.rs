use crate::connection::{ConnectionRegistry, StreamConnection};
use crate::message::{Frame, NOTIFICATION_LIST_SELECTOR, TOAST_CONTAINER_SELECTOR};
use crate::render::render;
use events::{NotificationEvent, UserId};
use log::*;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

/// Owns the connection registry and fans notifications out to it.
///
/// One instance is built at startup and shared through `AppState`.
pub struct Manager {
    registry: Arc<ConnectionRegistry>,
    shutdown: CancellationToken,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Register a new connection for an authenticated user.
    pub fn register_connection(
        &self,
        user_id: UserId,
        sender: Sender<Frame>,
    ) -> Arc<StreamConnection> {
        let connection = self.registry.register(user_id, sender);
        info!(
            "Registered SSE connection {} for user {user_id}",
            connection.id()
        );
        connection
    }

    /// Unregister a connection. Calling this more than once is harmless.
    pub fn unregister_connection(&self, connection: &StreamConnection) {
        if self.registry.unregister(connection) {
            info!(
                "Unregistered SSE connection {} for user {}",
                connection.id(),
                connection.owner()
            );
        }
    }

    pub fn connection_count_for(&self, user_id: UserId) -> usize {
        self.registry.connection_count_for(&user_id)
    }

    pub fn total_connections(&self) -> usize {
        self.registry.total_connections()
    }

    /// Push a notification to every open stream of `user_id`.
    ///
    /// Renders once and sends the same list item, toast and signal frames to
    /// each connection in registration order. A failed push is logged and
    /// skipped; the remaining connections are still attempted. Returns the
    /// number of connections that accepted every frame.
    pub fn notify_user(&self, user_id: UserId, notification: &NotificationEvent) -> usize {
        let connections = self.registry.connections_for(&user_id);
        info!(
            "Notifying user {user_id} of notification {} ({} active connection(s))",
            notification.id,
            connections.len()
        );
        if connections.is_empty() {
            return 0;
        }

        let rendered = render(notification);
        let frames = [
            Frame::append_to(NOTIFICATION_LIST_SELECTOR, rendered.list_item),
            Frame::append_to(TOAST_CONTAINER_SELECTOR, rendered.toast),
            Frame::signals([("hasNewNotification", Value::Bool(true))]),
        ];

        let mut delivered = 0;
        for connection in &connections {
            let mut accepted_all = true;
            for frame in &frames {
                if let Err(e) = connection.push(frame.clone()) {
                    warn!(
                        "Failed to push to SSE connection {} for user {user_id}: {e}. \
                         Connection will be cleaned up when its stream ends.",
                        connection.id()
                    );
                    accepted_all = false;
                }
            }
            if accepted_all {
                delivered += 1;
            }
        }

        debug!(
            "Delivered notification {} to {delivered}/{} connection(s) of user {user_id}",
            notification.id,
            connections.len()
        );
        delivered
    }

    /// Token cancelled when the server begins shutting down. Every open
    /// stream watches it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Unblock and close every open stream.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        let closed = self.registry.close_all();
        info!("SSE manager shut down, closed {closed} connection(s)");
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}
