//! In-memory UserRepository

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use hydra_core::{DomainError, RepoResult, User, UserRepository};

#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    password_hash: String,
}

/// DashMap-backed user store
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: DashMap<Uuid, UserRecord>,
    /// Email of every live (non-deleted) user
    emails: DashMap<String, Uuid>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the active flag. Test and admin helper, not part of the trait.
    pub fn set_active(&self, id: Uuid, active: bool) -> RepoResult<()> {
        self.modify_live(id, |record| {
            record.user.is_active = active;
        })
    }

    fn modify_live<F>(&self, id: Uuid, f: F) -> RepoResult<()>
    where
        F: FnOnce(&mut UserRecord),
    {
        match self.users.get_mut(&id) {
            Some(mut record) if !record.user.is_deleted() => {
                f(&mut record);
                record.user.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(DomainError::UserNotFound(id)),
        }
    }

    fn live(&self, id: Uuid) -> Option<UserRecord> {
        self.users
            .get(&id)
            .filter(|record| !record.user.is_deleted())
            .map(|record| record.clone())
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.live(id).map(|record| record.user))
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let id = self.emails.get(email).map(|entry| *entry.value());
        Ok(id.and_then(|id| self.live(id)).map(|record| record.user))
    }

    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        Ok(self.emails.contains_key(email))
    }

    async fn create(&self, user: &User, password_hash: &str) -> RepoResult<()> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(DomainError::EmailAlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(
                    user.id,
                    UserRecord {
                        user: user.clone(),
                        password_hash: password_hash.to_string(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn get_password_hash(&self, id: Uuid) -> RepoResult<Option<String>> {
        Ok(self.live(id).map(|record| record.password_hash))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> RepoResult<()> {
        self.modify_live(id, |record| {
            record.password_hash = password_hash.to_string();
        })
    }

    async fn mark_email_verified(&self, id: Uuid) -> RepoResult<()> {
        self.modify_live(id, |record| record.user.mark_email_verified())
    }

    async fn soft_delete(&self, id: Uuid) -> RepoResult<()> {
        let mut email = None;
        self.modify_live(id, |record| {
            record.user.mark_deleted();
            email = Some(record.user.email.clone());
        })?;

        if let Some(email) = email {
            self.emails.remove(&email);
        }
        Ok(())
    }
}
