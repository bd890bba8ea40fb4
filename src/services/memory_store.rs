use std::collections::BTreeMap;
use async_trait::async_trait;
use tokio::sync::RwLock;
use crate::errors::{StoreError, StoreResult};
use crate::models::{Reading, User, UserSummary};
use super::store::UserStore;

/// Process-local store for development runs and tests.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<BTreeMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn create_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.username) {
            return Err(StoreError::Duplicate(user.username.clone()));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    async fn find_user(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<UserSummary>> {
        Ok(self.users.read().await.values().map(UserSummary::from).collect())
    }

    async fn set_password_hash(&self, username: &str, password_hash: &str) -> StoreResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(username)
            .ok_or_else(|| StoreError::NotFound(username.to_string()))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> StoreResult<bool> {
        Ok(self.users.write().await.remove(username).is_some())
    }

    async fn append_reading(&self, username: &str, reading: &Reading) -> StoreResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(username)
            .ok_or_else(|| StoreError::NotFound(username.to_string()))?;
        user.history.push(reading.clone());
        Ok(())
    }

    async fn clear_history(&self, username: &str) -> StoreResult<usize> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(username)
            .ok_or_else(|| StoreError::NotFound(username.to_string()))?;
        Ok(std::mem::take(&mut user.history).len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::fitness::{Gender, Measurement};

    fn reading(weight: f64) -> Reading {
        let m = Measurement { weight_kg: weight, height_cm: 175.0, age: 30, gender: Gender::Male };
        Reading::new(&m, &m.compute(), Utc::now())
    }

    #[tokio::test]
    async fn test_duplicate_user_is_rejected_without_overwrite() {
        let store = MemoryUserStore::new();
        store.create_user(&User::new("amy", "hash-1".into(), false)).await.unwrap();

        let err = store
            .create_user(&User::new("amy", "hash-2".into(), true))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref n) if n == "amy"));

        let user = store.find_user("amy").await.unwrap().unwrap();
        assert_eq!(user.password_hash, "hash-1");
        assert!(!user.is_admin);
    }

    #[tokio::test]
    async fn test_clear_then_append() {
        let store = MemoryUserStore::new();
        store.create_user(&User::new("bob", "h".into(), false)).await.unwrap();
        for w in [60.0, 61.0, 62.0] {
            store.append_reading("bob", &reading(w)).await.unwrap();
        }

        assert_eq!(store.clear_history("bob").await.unwrap(), 3);
        assert!(store.find_user("bob").await.unwrap().unwrap().history.is_empty());

        store.append_reading("bob", &reading(63.0)).await.unwrap();
        let history = store.find_user("bob").await.unwrap().unwrap().history;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].weight_kg, 63.0);
    }

    #[tokio::test]
    async fn test_history_keeps_insertion_order() {
        let store = MemoryUserStore::new();
        store.create_user(&User::new("cy", "h".into(), false)).await.unwrap();
        for w in [50.0, 55.0, 52.0] {
            store.append_reading("cy", &reading(w)).await.unwrap();
        }
        let weights: Vec<f64> = store
            .find_user("cy")
            .await
            .unwrap()
            .unwrap()
            .history
            .iter()
            .map(|r| r.weight_kg)
            .collect();
        assert_eq!(weights, vec![50.0, 55.0, 52.0]);
    }

    #[tokio::test]
    async fn test_missing_user_operations() {
        let store = MemoryUserStore::new();
        assert!(!store.delete_user("ghost").await.unwrap());
        assert!(matches!(
            store.append_reading("ghost", &reading(70.0)).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(store.clear_history("ghost").await, Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.set_password_hash("ghost", "h").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let store = MemoryUserStore::new();
        store.create_user(&User::new("zed", "h".into(), false)).await.unwrap();
        store.create_user(&User::new("ann", "h".into(), true)).await.unwrap();
        store.append_reading("zed", &reading(80.0)).await.unwrap();

        let users = store.list_users().await.unwrap();
        assert_eq!(
            users,
            vec![
                UserSummary { username: "ann".into(), is_admin: true, reading_count: 0 },
                UserSummary { username: "zed".into(), is_admin: false, reading_count: 1 },
            ]
        );

        assert!(store.delete_user("zed").await.unwrap());
        assert!(store.find_user("zed").await.unwrap().is_none());
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }
}
