//! In-memory user store
//!
//! Backs the test suite and the database-less dev mode. Reads go straight to
//! the `DashMap`; writers serialize on a mutex so the username/email
//! uniqueness check and the insert happen atomically.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::{NewUser, Role, UserRecord};
use super::store::{StoreError, UserStore};

#[derive(Debug, Clone)]
struct StoredUser {
    record: UserRecord,
    password_hash: String,
    seq: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: DashMap<String, StoredUser>,
    write_lock: Mutex<()>,
    next_seq: AtomicU64,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// An exact username match wins over an email match.
    fn find_by_identifier(&self, identifier: &str) -> Option<StoredUser> {
        let mut email_match = None;
        for entry in self.users.iter() {
            if entry.record.username == identifier {
                return Some(entry.value().clone());
            }
            if email_match.is_none() && entry.record.matches_identifier(identifier) {
                email_match = Some(entry.value().clone());
            }
        }
        email_match
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_password_hash(&self, identifier: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .find_by_identifier(identifier)
            .map(|user| user.password_hash))
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.get(id).map(|entry| entry.record.clone()))
    }

    async fn get_user_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.find_by_identifier(identifier).map(|user| user.record))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserRecord, StoreError> {
        let _guard = self.write_lock.lock().await;

        for entry in self.users.iter() {
            if let Some(field) = entry
                .record
                .identifier_conflict(&new_user.username, &new_user.email)
            {
                return Err(StoreError::Conflict(field));
            }
        }

        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            username: new_user.username,
            email: new_user.email,
            role: new_user.role,
            created_at: Utc::now(),
        };
        let stored = StoredUser {
            record: record.clone(),
            password_hash: new_user.password_hash,
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
        };
        self.users.insert(record.id.clone(), stored);

        Ok(record)
    }

    async fn list_users(&self, limit: u32, offset: u32) -> Result<Vec<UserRecord>, StoreError> {
        let mut all: Vec<StoredUser> = self.users.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|user| user.seq);

        Ok(all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|user| user.record)
            .collect())
    }

    async fn update_role(&self, id: &str, role: Role) -> Result<Option<UserRecord>, StoreError> {
        let _guard = self.write_lock.lock().await;

        Ok(self.users.get_mut(id).map(|mut entry| {
            entry.record.role = role;
            entry.record.clone()
        }))
    }

    async fn delete_user(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        Ok(self.users.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str, role: Role) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: format!("hash-of-{}", username),
            role,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let store = InMemoryUserStore::new();
        let created = store
            .create_user(new_user("alice", "alice@example.com", Role::SuperUser))
            .await
            .unwrap();

        let by_id = store.get_user_by_id(&created.id).await.unwrap();
        assert_eq!(by_id.as_ref(), Some(&created));

        let by_email = store
            .get_user_by_identifier("ALICE@example.com")
            .await
            .unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(created.id.clone()));

        let hash = store.get_password_hash("alice").await.unwrap();
        assert_eq!(hash.as_deref(), Some("hash-of-alice"));

        assert!(store.get_password_hash("nobody").await.unwrap().is_none());
        assert!(store.get_user_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_uniqueness_conflicts() {
        let store = InMemoryUserStore::new();
        store
            .create_user(new_user("alice", "alice@example.com", Role::RegularUser))
            .await
            .unwrap();

        let dup_name = store
            .create_user(new_user("alice", "other@example.com", Role::RegularUser))
            .await;
        assert!(matches!(dup_name, Err(StoreError::Conflict("username"))));

        let dup_email = store
            .create_user(new_user("bob", "Alice@Example.com", Role::RegularUser))
            .await;
        assert!(matches!(dup_email, Err(StoreError::Conflict("email"))));

        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_username_and_email_share_one_namespace() {
        let store = InMemoryUserStore::new();
        let alice = store
            .create_user(new_user("alice", "alice@example.com", Role::RegularUser))
            .await
            .unwrap();

        let shadow = store
            .create_user(new_user("ALICE@example.com", "shadow@example.com", Role::RegularUser))
            .await;
        assert!(matches!(shadow, Err(StoreError::Conflict("username"))));

        let shadow = store
            .create_user(new_user("mallory", "Alice", Role::RegularUser))
            .await;
        assert!(matches!(shadow, Err(StoreError::Conflict("email"))));
        assert_eq!(store.len(), 1);

        // Hash and record always come from the same account
        for _ in 0..8 {
            let record = store
                .get_user_by_identifier("alice@example.com")
                .await
                .unwrap();
            assert_eq!(record.map(|u| u.id), Some(alice.id.clone()));
            let hash = store.get_password_hash("alice@example.com").await.unwrap();
            assert_eq!(hash.as_deref(), Some("hash-of-alice"));
        }
    }

    #[tokio::test]
    async fn test_list_update_delete() {
        let store = InMemoryUserStore::new();
        let a = store
            .create_user(new_user("a", "a@example.com", Role::RegularUser))
            .await
            .unwrap();
        let b = store
            .create_user(new_user("b", "b@example.com", Role::RegularUser))
            .await
            .unwrap();
        store
            .create_user(new_user("c", "c@example.com", Role::RegularUser))
            .await
            .unwrap();

        let page = store.list_users(2, 0).await.unwrap();
        assert_eq!(
            page.iter().map(|u| u.username.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        let page = store.list_users(10, 2).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].username, "c");

        let updated = store.update_role(&b.id, Role::SuperUser).await.unwrap();
        assert_eq!(updated.map(|u| u.role), Some(Role::SuperUser));
        assert!(
            store
                .update_role("missing", Role::SuperUser)
                .await
                .unwrap()
                .is_none()
        );

        assert!(store.delete_user(&a.id).await.unwrap());
        assert!(!store.delete_user(&a.id).await.unwrap());
        assert!(store.get_user_by_identifier("a").await.unwrap().is_none());
    }
}
