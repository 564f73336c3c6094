use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::store::{Filter, RowStore, StoreError};

pub const USERS_TABLE: &str = "users";

/// User record as stored. Emails are compared exactly as stored
/// (case-sensitive); uniqueness is checked before insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub salt: String,
}

/// CRUD over user rows, keyed by email.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn RowStore>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let rows = self
            .store
            .select(USERS_TABLE, &Filter::eq("email", email))
            .await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row).map_err(StoreError::Malformed)?)),
            None => Ok(None),
        }
    }

    /// Insert a new user; the store assigns the id.
    pub async fn create(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
        salt: &str,
    ) -> Result<User, StoreError> {
        let row = self
            .store
            .insert(
                USERS_TABLE,
                json!({
                    "email": email,
                    "name": name,
                    "password_hash": password_hash,
                    "salt": salt,
                }),
            )
            .await?;
        serde_json::from_value(row).map_err(StoreError::Malformed)
    }

    pub async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        salt: &str,
    ) -> Result<(), StoreError> {
        self.store
            .update(
                USERS_TABLE,
                &Filter::eq("id", id.to_string()),
                json!({ "password_hash": password_hash, "salt": salt }),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_secret;
    use crate::store::MemoryStore;

    fn directory() -> UserDirectory {
        UserDirectory::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_then_find_by_email() {
        let users = directory();
        let cred = hash_secret("secret1");
        let created = users
            .create("a@b.com", "Alice", &cred.digest, &cred.salt)
            .await
            .expect("create");
        let found = users
            .find_by_email("a@b.com")
            .await
            .expect("find")
            .expect("user exists");
        assert_eq!(found.id, created.id);
        assert_eq!(found.name, "Alice");
    }

    #[tokio::test]
    async fn find_missing_email_returns_none() {
        let users = directory();
        assert!(users.find_by_email("nobody@b.com").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn email_lookup_is_case_sensitive() {
        let users = directory();
        let cred = hash_secret("secret1");
        users
            .create("a@b.com", "Alice", &cred.digest, &cred.salt)
            .await
            .expect("create");
        assert!(users.find_by_email("A@B.COM").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn update_password_replaces_digest_and_salt() {
        let users = directory();
        let old = hash_secret("secret1");
        let user = users
            .create("a@b.com", "Alice", &old.digest, &old.salt)
            .await
            .expect("create");
        let new = hash_secret("newpass1");
        users
            .update_password(user.id, &new.digest, &new.salt)
            .await
            .expect("update");
        let reloaded = users
            .find_by_email("a@b.com")
            .await
            .expect("find")
            .expect("user exists");
        assert_eq!(reloaded.password_hash, new.digest);
        assert_eq!(reloaded.salt, new.salt);
    }
}
