//! The durable store the notification core depends on.
//!
//! The SQL drivers live outside this repository; the core only needs the
//! operations on [`NotificationStore`]. [`MemoryStore`] implements them in
//! process for the binary and for tests.

use async_trait::async_trait;
use events::UserId;
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;

pub mod memory;

pub use memory::MemoryStore;

/// Errors while executing store operations.
#[derive(Debug, PartialEq)]
pub struct Error {
    pub message: String,
    pub error_kind: StoreErrorKind,
}

#[derive(Debug, PartialEq, Serialize)]
pub enum StoreErrorKind {
    // Invalid filter or update
    InvalidQueryTerm,
    // Record not found
    RecordNotFound,
    // Errors from the backing storage itself
    SystemError,
    Other,
}

impl Error {
    pub fn new(error_kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Error {
            message: message.into(),
            error_kind,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Store Error ({:?}): {}", self.error_kind, self.message)
    }
}

impl StdError for Error {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Normal,
    Archived,
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub nickname: String,
    pub row_status: RowStatus,
}

impl User {
    /// Nickname when set, otherwise the username.
    pub fn display_name(&self) -> &str {
        if self.nickname.is_empty() {
            &self.username
        } else {
            &self.nickname
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Memo {
    pub id: i32,
    pub uid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoCommentRef {
    /// The comment memo.
    pub memo_id: i32,
    /// The memo that was commented on.
    pub related_memo_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TicketCommentRef {
    pub ticket_id: i32,
}

/// What the notification is about, as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredPayload {
    pub memo_comment: Option<MemoCommentRef>,
    pub ticket_comment: Option<TicketCommentRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: i32,
    pub initiator_id: UserId,
    pub receiver_id: UserId,
    pub ticket_url: String,
    /// Unix seconds.
    pub created_ts: i64,
    pub is_read: bool,
    pub payload: StoredPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub initiator_id: UserId,
    pub receiver_id: UserId,
    pub ticket_url: String,
    pub payload: StoredPayload,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindNotification {
    pub id: Option<i32>,
    pub receiver_id: Option<UserId>,
    pub is_read: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateNotification {
    pub id: i32,
    pub is_read: Option<bool>,
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create_notification(&self, create: NewNotification) -> Result<Notification, Error>;

    /// Matching notifications, newest first.
    async fn list_notifications(&self, find: &FindNotification) -> Result<Vec<Notification>, Error>;

    async fn update_notification(&self, update: &UpdateNotification) -> Result<Notification, Error>;

    async fn find_user(&self, id: UserId) -> Result<Option<User>, Error>;

    async fn find_memo(&self, id: i32) -> Result<Option<Memo>, Error>;
}
