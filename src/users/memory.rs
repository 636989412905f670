//! In-process `UserRepository` used by tests in place of Postgres.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    repo::{RepoError, UserRepository},
    repo_types::{DeleteOutcome, NewUser, UpdateOutcome, User, UserFilter, UserPatch},
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: NewUser) -> Result<Uuid, RepoError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepoError::DuplicateKey);
        }
        let id = Uuid::new_v4();
        users.push(User {
            id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            password_hash: user.password_hash,
            is_blocked: false,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(id)
    }

    async fn find_many(&self, filter: &UserFilter) -> Result<Vec<User>, RepoError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().filter(|u| filter.matches(u)).cloned().collect())
    }

    async fn find_one(&self, filter: &UserFilter) -> Result<User, RepoError> {
        let users = self.users.lock().unwrap();
        users
            .iter()
            .find(|u| filter.matches(u))
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn update(&self, filter: &UserFilter, patch: &UserPatch) -> Result<UpdateOutcome, RepoError> {
        let mut users = self.users.lock().unwrap();
        if let Some(email) = &patch.email {
            let taken = users
                .iter()
                .any(|u| u.email == *email && !filter.matches(u));
            if taken {
                return Err(RepoError::DuplicateKey);
            }
        }
        let mut outcome = UpdateOutcome::default();
        for user in users.iter_mut().filter(|u| filter.matches(u)) {
            outcome.matched_count += 1;
            if !patch.is_empty() {
                patch.apply(user);
                outcome.modified_count += 1;
            }
        }
        Ok(outcome)
    }

    async fn delete(&self, filter: &UserFilter) -> Result<DeleteOutcome, RepoError> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| !filter.matches(u));
        Ok(DeleteOutcome {
            deleted_count: (before - users.len()) as u64,
        })
    }

    async fn count_all(&self) -> Result<i64, RepoError> {
        Ok(self.users.lock().unwrap().len() as i64)
    }
}
