//! Recording notifications and presenting them to their receiver.
//!
//! [`record`] is the producer path: it writes to the store first and only
//! then publishes `NotificationRecorded`, so nothing is pushed live that was
//! not durably recorded.

use crate::error::{EntityErrorKind, Error};
use crate::store::{
    FindNotification, NewNotification, Notification, NotificationStore, StoredPayload,
    UpdateNotification,
};
use chrono::{DateTime, Utc};
use events::{DomainEvent, EventPublisher, NotificationEvent, NotificationKind, UserId};
use log::*;
use serde::Serialize;
use utoipa::ToSchema;

pub const MEMO_NAME_PREFIX: &str = "memos/";
pub const UNKNOWN_INITIATOR: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemoCommentPayload {
    pub memo: String,
    pub related_memo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketCommentPayload {
    pub ticket_id: i32,
}

/// Client-facing payload. Empty when the referenced records could not be
/// resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo_comment: Option<MemoCommentPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_comment: Option<TicketCommentPayload>,
}

impl NotificationPayload {
    pub fn kind(&self) -> NotificationKind {
        if self.memo_comment.is_some() {
            NotificationKind::MemoComment
        } else if self.ticket_comment.is_some() {
            NotificationKind::TicketComment
        } else {
            NotificationKind::Unknown
        }
    }
}

/// A notification as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: i32,
    pub initiator_id: UserId,
    pub initiator_name: String,
    pub receiver_id: UserId,
    pub ticket_url: String,
    pub created_ts: i64,
    pub is_read: bool,
    pub payload: NotificationPayload,
}

/// Persist a notification, then announce it for live delivery.
///
/// If the store rejects the write the error is returned and nothing is
/// published.
pub async fn record(
    store: &dyn NotificationStore,
    publisher: &EventPublisher,
    new_notification: NewNotification,
) -> Result<Notification, Error> {
    let receiver_id = new_notification.receiver_id;
    let notification = store
        .create_notification(new_notification)
        .await
        .map_err(|e| {
            warn!("Failed to record notification for user {receiver_id}: {e}");
            e
        })?;

    let event = to_event(store, &notification).await;
    publisher
        .publish(DomainEvent::NotificationRecorded {
            receiver_id: notification.receiver_id,
            notification: event,
        })
        .await;

    Ok(notification)
}

pub async fn list_for_receiver(
    store: &dyn NotificationStore,
    receiver_id: UserId,
) -> Result<Vec<NotificationView>, Error> {
    let list = store
        .list_notifications(&FindNotification {
            receiver_id: Some(receiver_id),
            ..Default::default()
        })
        .await?;

    let mut views = Vec::with_capacity(list.len());
    for notification in &list {
        views.push(to_view(store, notification).await);
    }
    Ok(views)
}

/// Update the read state of a notification owned by `user_id`.
pub async fn update_read_state(
    store: &dyn NotificationStore,
    user_id: UserId,
    id: i32,
    is_read: Option<bool>,
) -> Result<NotificationView, Error> {
    let existing = store
        .list_notifications(&FindNotification {
            id: Some(id),
            ..Default::default()
        })
        .await?;

    let notification = existing.first().ok_or_else(|| {
        debug!("Notification {id} not found");
        Error::entity(EntityErrorKind::NotFound)
    })?;
    if notification.receiver_id != user_id {
        warn!(
            "User {user_id} attempted to update notification {id} owned by user {}",
            notification.receiver_id
        );
        return Err(Error::entity(EntityErrorKind::Forbidden));
    }

    let updated = store
        .update_notification(&UpdateNotification { id, is_read })
        .await?;
    Ok(to_view(store, &updated).await)
}

/// Resolve the stored references into client-facing names.
///
/// A memo that cannot be loaded (lookup error, or deleted) yields an empty
/// payload rather than an error; the notification is still shown, just
/// without its memo link.
pub async fn convert_payload(
    store: &dyn NotificationStore,
    payload: &StoredPayload,
) -> NotificationPayload {
    let empty = NotificationPayload::default();

    if let Some(memo_comment) = payload.memo_comment {
        let memo = match store.find_memo(memo_comment.memo_id).await {
            Ok(Some(memo)) => memo,
            Ok(None) => {
                debug!("Memo {} no longer exists, skipping payload", memo_comment.memo_id);
                return empty;
            }
            Err(e) => {
                warn!("Failed to load memo {}: {e}", memo_comment.memo_id);
                return empty;
            }
        };
        let related_memo = match store.find_memo(memo_comment.related_memo_id).await {
            Ok(Some(memo)) => memo,
            Ok(None) => {
                debug!(
                    "Related memo {} no longer exists, skipping payload",
                    memo_comment.related_memo_id
                );
                return empty;
            }
            Err(e) => {
                warn!("Failed to load related memo {}: {e}", memo_comment.related_memo_id);
                return empty;
            }
        };

        NotificationPayload {
            memo_comment: Some(MemoCommentPayload {
                memo: format!("{MEMO_NAME_PREFIX}{}", memo.uid),
                related_memo: format!("{MEMO_NAME_PREFIX}{}", related_memo.uid),
            }),
            ticket_comment: None,
        }
    } else if let Some(ticket_comment) = payload.ticket_comment {
        NotificationPayload {
            memo_comment: None,
            ticket_comment: Some(TicketCommentPayload {
                ticket_id: ticket_comment.ticket_id,
            }),
        }
    } else {
        empty
    }
}

/// Display name of the initiator, or `"Unknown"` when it cannot be resolved.
pub async fn initiator_name(store: &dyn NotificationStore, initiator_id: UserId) -> String {
    match store.find_user(initiator_id).await {
        Ok(Some(user)) => user.display_name().to_string(),
        Ok(None) => {
            warn!("Failed to resolve initiator name for user {initiator_id}");
            UNKNOWN_INITIATOR.to_string()
        }
        Err(e) => {
            warn!("Failed to load initiator {initiator_id}: {e}");
            UNKNOWN_INITIATOR.to_string()
        }
    }
}

async fn to_view(store: &dyn NotificationStore, notification: &Notification) -> NotificationView {
    NotificationView {
        id: notification.id,
        initiator_id: notification.initiator_id,
        initiator_name: initiator_name(store, notification.initiator_id).await,
        receiver_id: notification.receiver_id,
        ticket_url: notification.ticket_url.clone(),
        created_ts: notification.created_ts,
        is_read: notification.is_read,
        payload: convert_payload(store, &notification.payload).await,
    }
}

async fn to_event(store: &dyn NotificationStore, notification: &Notification) -> NotificationEvent {
    let payload = convert_payload(store, &notification.payload).await;

    NotificationEvent {
        id: notification.id,
        kind: payload.kind(),
        sender_display_name: initiator_name(store, notification.initiator_id).await,
        sender_id: notification.initiator_id,
        related_memo: payload.memo_comment.as_ref().map(|m| m.related_memo.clone()),
        ticket_id: payload.ticket_comment.as_ref().map(|t| t.ticket_id),
        ticket_name: (!notification.ticket_url.is_empty()).then(|| notification.ticket_url.clone()),
        snippet: None,
        occurred_at: DateTime::from_timestamp(notification.created_ts, 0).unwrap_or_else(Utc::now),
    }
}
