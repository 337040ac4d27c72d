//! Server-Sent Events (SSE) infrastructure for live notifications.
//!
//! This crate pushes freshly recorded notifications from the backend to the
//! browser sessions of the user they are addressed to.
//!
//! # Architecture
//!
//! - **Many connections per user**: every open tab holds its own stream; a
//!   notification is fanned out to all of them.
//! - **Per-user registry**: a `DashMap` keyed by user id, each bucket an
//!   ordered map of live connections. Removal is by connection identity.
//! - **Ephemeral delivery**: a user without an open stream simply misses the
//!   live push. The notification is still in the store and shows up on the
//!   next page load.
//! - **Rendered fragments**: notifications are pushed as ready-to-insert
//!   markup (list item and toast) plus a small signal update, in the Datastar
//!   SSE dialect.
//!
//! # Message Flow
//!
//! 1. Frontend opens `GET /notifications/stream`
//! 2. Backend authenticates the request and registers a `StreamConnection`
//! 3. A producer records a notification in the store, then publishes
//!    `DomainEvent::NotificationRecorded`
//! 4. `SseDomainEventHandler` calls `Manager::notify_user`, which renders the
//!    notification once and pushes it to each of the user's connections
//! 5. When the client disconnects, the stream is dropped and the connection
//!   unregisters itself
//!
//! # Modules
//!
//! - `connection`: `ConnectionRegistry`, `StreamConnection` and `ConnectionId`
//! - `manager`: fan-out entry point and shutdown control
//! - `message`: push frames and their wire encoding
//! - `render`: pure markup rendering of notifications

pub mod connection;
pub mod domain_event_handler;
pub mod manager;
pub mod message;
pub mod render;

pub use manager::Manager;
