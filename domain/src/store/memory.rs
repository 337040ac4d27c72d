use super::{
    Error, FindNotification, Memo, NewNotification, Notification, NotificationStore, RowStatus,
    StoreErrorKind, UpdateNotification, User,
};
use async_trait::async_trait;
use chrono::Utc;
use events::UserId;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    next_notification_id: i32,
    notifications: BTreeMap<i32, Notification>,
    users: HashMap<UserId, User>,
    memos: HashMap<i32, Memo>,
}

/// In-process store backed by ordinary maps behind an async `RwLock`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id, user);
    }

    pub async fn upsert_memo(&self, memo: Memo) {
        self.tables.write().await.memos.insert(memo.id, memo);
    }

    /// Populate a fresh store with a couple of users and memos so a local
    /// server has someone to authenticate as. Returns the seeded users.
    pub async fn seed_development_data(&self) -> Vec<User> {
        let users = vec![
            User {
                id: 1,
                username: "admin".to_string(),
                nickname: "Admin".to_string(),
                row_status: RowStatus::Normal,
            },
            User {
                id: 2,
                username: "demo".to_string(),
                nickname: String::new(),
                row_status: RowStatus::Normal,
            },
        ];

        let mut tables = self.tables.write().await;
        for user in &users {
            tables.users.insert(user.id, user.clone());
        }
        for (id, uid) in [(1, "welcome"), (2, "welcome-reply")] {
            tables.memos.insert(
                id,
                Memo {
                    id,
                    uid: uid.to_string(),
                },
            );
        }

        users
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create_notification(&self, create: NewNotification) -> Result<Notification, Error> {
        let mut tables = self.tables.write().await;
        tables.next_notification_id += 1;
        let notification = Notification {
            id: tables.next_notification_id,
            initiator_id: create.initiator_id,
            receiver_id: create.receiver_id,
            ticket_url: create.ticket_url,
            created_ts: Utc::now().timestamp(),
            is_read: false,
            payload: create.payload,
        };
        tables
            .notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn list_notifications(&self, find: &FindNotification) -> Result<Vec<Notification>, Error> {
        let tables = self.tables.read().await;
        let mut list: Vec<Notification> = tables
            .notifications
            .values()
            .filter(|n| find.id.map_or(true, |id| n.id == id))
            .filter(|n| find.receiver_id.map_or(true, |id| n.receiver_id == id))
            .filter(|n| find.is_read.map_or(true, |is_read| n.is_read == is_read))
            .cloned()
            .collect();

        // Newest first; ids break ties within the same second
        list.sort_by(|a, b| b.created_ts.cmp(&a.created_ts).then(b.id.cmp(&a.id)));

        let offset = find.offset.unwrap_or(0);
        let limit = find.limit.unwrap_or(usize::MAX);
        Ok(list.into_iter().skip(offset).take(limit).collect())
    }

    async fn update_notification(&self, update: &UpdateNotification) -> Result<Notification, Error> {
        let mut tables = self.tables.write().await;
        let notification = tables.notifications.get_mut(&update.id).ok_or_else(|| {
            Error::new(
                StoreErrorKind::RecordNotFound,
                format!("notification {}", update.id),
            )
        })?;

        if let Some(is_read) = update.is_read {
            notification.is_read = is_read;
        }
        Ok(notification.clone())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, Error> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_memo(&self, id: i32) -> Result<Option<Memo>, Error> {
        Ok(self.tables.read().await.memos.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoredPayload;

    fn new_notification(receiver_id: UserId) -> NewNotification {
        NewNotification {
            initiator_id: 1,
            receiver_id,
            ticket_url: String::new(),
            payload: StoredPayload::default(),
        }
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids_and_starts_unread() {
        let store = MemoryStore::new();
        let first = store.create_notification(new_notification(2)).await.unwrap();
        let second = store.create_notification(new_notification(2)).await.unwrap();

        assert!(second.id > first.id);
        assert!(!first.is_read);
    }

    #[tokio::test]
    async fn list_filters_by_receiver_and_read_state_newest_first() {
        let store = MemoryStore::new();
        let a = store.create_notification(new_notification(2)).await.unwrap();
        let b = store.create_notification(new_notification(2)).await.unwrap();
        store.create_notification(new_notification(3)).await.unwrap();
        store
            .update_notification(&UpdateNotification {
                id: a.id,
                is_read: Some(true),
            })
            .await
            .unwrap();

        let all_for_two = store
            .list_notifications(&FindNotification {
                receiver_id: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<i32> = all_for_two.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);

        let unread = store
            .list_notifications(&FindNotification {
                receiver_id: Some(2),
                is_read: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, b.id);
    }

    #[tokio::test]
    async fn list_applies_offset_and_limit() {
        let store = MemoryStore::new();
        for _ in 0..5 {
            store.create_notification(new_notification(9)).await.unwrap();
        }

        let page = store
            .list_notifications(&FindNotification {
                limit: Some(2),
                offset: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();

        let ids: Vec<i32> = page.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![4, 3]);
    }

    #[tokio::test]
    async fn updating_missing_notification_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_notification(&UpdateNotification {
                id: 99,
                is_read: Some(true),
            })
            .await
            .unwrap_err();

        assert_eq!(err.error_kind, StoreErrorKind::RecordNotFound);
    }

    #[tokio::test]
    async fn development_seed_users_are_active_and_findable() {
        let store = MemoryStore::new();

        let users = store.seed_development_data().await;

        assert_eq!(users.len(), 2);
        for user in users {
            let found = store.find_user(user.id).await.unwrap().unwrap();
            assert_eq!(found.row_status, RowStatus::Normal);
        }
        assert!(store.find_memo(1).await.unwrap().is_some());
    }
}
