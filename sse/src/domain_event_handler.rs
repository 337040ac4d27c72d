use crate::Manager;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use log::*;
use std::sync::Arc;

/// Handles domain events by pushing live notifications to the affected user.
///
/// The recording path only publishes `NotificationRecorded` after the store
/// accepted the notification, so anything reaching this handler is already
/// durable.
pub struct SseDomainEventHandler {
    sse_manager: Arc<Manager>,
}

impl SseDomainEventHandler {
    pub fn new(sse_manager: Arc<Manager>) -> Self {
        Self { sse_manager }
    }
}

#[async_trait]
impl EventHandler for SseDomainEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::NotificationRecorded {
                receiver_id,
                notification,
            } => {
                debug!(
                    "Handling NotificationRecorded event {} for user {}",
                    notification.id, receiver_id
                );
                self.sse_manager.notify_user(*receiver_id, notification);
            }
        }
    }
}
