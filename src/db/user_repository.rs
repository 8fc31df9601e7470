use crate::db::Database;
use crate::errors::AppError;
use crate::models::user::User;
use bincode::{Decode, Encode};
use chrono::{DateTime, Utc};
use sled::Tree;
use std::str;
use tracing::info;

const USERS_TREE: &str = "users";
const EMAIL_INDEX_TREE: &str = "email_index";
const USERNAME_INDEX_TREE: &str = "username_index";

#[derive(Debug, Encode, Decode)]
pub struct StoredUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: i64, // microseconds since epoch
    pub updated_at: i64,
}

impl From<&User> for StoredUser {
    fn from(user: &User) -> Self {
        StoredUser {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            created_at: user.created_at.timestamp_micros(),
            updated_at: user.updated_at.timestamp_micros(),
        }
    }
}

impl From<StoredUser> for User {
    fn from(stored: StoredUser) -> Self {
        User {
            id: stored.id,
            username: stored.username,
            email: stored.email,
            password_hash: stored.password_hash,
            created_at: from_micros(stored.created_at),
            updated_at: from_micros(stored.updated_at),
        }
    }
}

pub(crate) fn from_micros(micros: i64) -> DateTime<Utc> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos).unwrap_or_else(Utc::now)
}

pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        UserRepository { db }
    }

    fn tree(&self, name: &str) -> Result<Tree, AppError> {
        Ok(self.db.db.open_tree(name)?)
    }

    /// Inserts a new user, claiming its email and username atomically.
    ///
    /// Expects `email` already normalized; usernames are compared case-insensitively.
    pub async fn create(&self, user: User) -> Result<User, AppError> {
        let users_tree = self.tree(USERS_TREE)?;
        let email_index = self.tree(EMAIL_INDEX_TREE)?;
        let username_index = self.tree(USERNAME_INDEX_TREE)?;

        let id = user.id.as_bytes();
        let email_key = user.email.as_bytes();
        let username_key = user.username.to_lowercase();

        if email_index
            .compare_and_swap(email_key, None::<&[u8]>, Some(id))?
            .is_err()
        {
            return Err(AppError::invalid("email", "Email is already registered"));
        }

        if username_index
            .compare_and_swap(username_key.as_bytes(), None::<&[u8]>, Some(id))?
            .is_err()
        {
            release(&email_index, email_key, id)?;
            return Err(AppError::invalid("username", "Username is already taken"));
        }

        let stored = StoredUser::from(&user);
        let inserted = encode(&stored).and_then(|encoded| Ok(users_tree.insert(id, encoded)?));
        if let Err(e) = inserted {
            release(&email_index, email_key, id)?;
            release(&username_index, username_key.as_bytes(), id)?;
            return Err(e);
        }

        info!(user_id = %user.id, email = %user.email, "User created in database");

        Ok(user)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let users_tree = self.tree(USERS_TREE)?;

        match users_tree.get(id.as_bytes())? {
            Some(data) => Ok(Some(User::from(decode(&data)?))),
            None => Ok(None),
        }
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email_index = self.tree(EMAIL_INDEX_TREE)?;

        match email_index.get(email.as_bytes())? {
            Some(user_id) => {
                let id = str::from_utf8(&user_id)
                    .map_err(|e| AppError::Internal(format!("Invalid user ID in email index: {}", e)))?;
                self.get_by_id(id).await
            }
            None => Ok(None),
        }
    }
}

// Drops an index entry only if it still points at `id`.
fn release(index: &Tree, key: &[u8], id: &[u8]) -> Result<(), AppError> {
    let _ = index.compare_and_swap(key, Some(id), None::<&[u8]>)?;
    Ok(())
}

fn encode(stored: &StoredUser) -> Result<Vec<u8>, AppError> {
    bincode::encode_to_vec(stored, bincode::config::standard())
        .map_err(|e| AppError::Internal(format!("Failed to encode user: {}", e)))
}

fn decode(data: &[u8]) -> Result<StoredUser, AppError> {
    let (stored, _): (StoredUser, usize) =
        bincode::decode_from_slice(data, bincode::config::standard())
            .map_err(|e| AppError::Internal(format!("Failed to decode user: {}", e)))?;
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_user(username: &str, email: &str) -> User {
        User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hashed_password".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn repo() -> UserRepository {
        UserRepository::new(Database::temporary().unwrap())
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = repo();
        let user = create_test_user("testuser", "test@example.com");

        let created = repo.create(user.clone()).await.unwrap();
        assert_eq!(created.id, user.id);

        let retrieved = repo.get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(retrieved.email, user.email);
        assert_eq!(retrieved.password_hash, "hashed_password");
        assert_eq!(
            retrieved.created_at.timestamp_micros(),
            user.created_at.timestamp_micros()
        );
    }

    #[tokio::test]
    async fn test_get_by_email() {
        let repo = repo();
        let user = create_test_user("testuser", "test@example.com");

        repo.create(user.clone()).await.unwrap();

        let retrieved = repo.get_by_email(&user.email).await.unwrap().unwrap();
        assert_eq!(retrieved.id, user.id);
        assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let repo = repo();
        repo.create(create_test_user("first", "dup@example.com"))
            .await
            .unwrap();

        let result = repo.create(create_test_user("second", "dup@example.com")).await;
        match result {
            Err(AppError::Validation(violations)) => assert_eq!(violations[0].field, "email"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_releases_email() {
        let repo = repo();
        repo.create(create_test_user("alice", "alice@example.com"))
            .await
            .unwrap();

        let result = repo.create(create_test_user("ALICE", "other@example.com")).await;
        match result {
            Err(AppError::Validation(violations)) => assert_eq!(violations[0].field, "username"),
            other => panic!("expected validation error, got {:?}", other),
        }

        // The rejected registration must not keep other@example.com reserved.
        repo.create(create_test_user("bob", "other@example.com"))
            .await
            .unwrap();
    }
}
