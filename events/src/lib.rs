//! Event system infrastructure for the notification platform.
//!
//! This crate provides the event system that decouples producers (code that
//! has just durably recorded a notification) from delivery concerns (like SSE
//! fan-out to connected browsers).
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum representing all business events in the system
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//! - **NotificationEvent**: The transient, already-persisted notification
//!   handed to delivery handlers
//!
//! This crate has no dependencies on internal crates, avoiding circular
//! dependencies between `domain`, `sse` and `web`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Identifier of a user account. Matches the integer ids used by the store.
pub type UserId = i32;

/// Which kind of activity produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    MemoComment,
    TicketComment,
    /// Fallback for notification types this build does not know how to describe.
    Unknown,
}

/// A notification that has already been durably recorded and is ready for
/// live delivery. Produced once by the recording path, consumed once by the
/// dispatcher; never stored by the delivery layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEvent {
    /// Id of the persisted notification, used by clients for dedup and click-through.
    pub id: i32,
    pub kind: NotificationKind,
    /// Free text supplied by users. Must be escaped before it is embedded in markup.
    pub sender_display_name: String,
    pub sender_id: UserId,
    /// Memo reference (e.g. `memos/abc123`) for memo comments.
    pub related_memo: Option<String>,
    pub ticket_id: Option<i32>,
    pub ticket_name: Option<String>,
    pub snippet: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Domain events that represent business-level changes in the system.
/// These events are emitted only after the underlying change was persisted.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// Emitted after a notification has been written to the store.
    /// Triggers a live push to every open stream of the receiver.
    NotificationRecorded {
        /// The user the notification is addressed to.
        receiver_id: UserId,
        notification: NotificationEvent,
    },
}

/// Trait for handling domain events.
/// Implementations can perform side effects like sending notifications,
/// updating caches, logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Publish an event to all registered handlers, sequentially.
    pub async fn publish(&self, event: DomainEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
