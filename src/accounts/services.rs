use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::errors::AccountError;
use crate::{
    auth::{claims::Claims, jwt::JwtKeys, password::Credentials},
    users::{
        dto::CreateUserRequest,
        repo::UserRepository,
        repo_types::{DeleteOutcome, NewUser, UpdateOutcome, User, UserFilter, UserPatch},
    },
};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin123";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Account operations the HTTP boundary depends on.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Creates the bootstrap admin when the store is empty. Returns whether it was created.
    async fn ensure_admin_exists(&self) -> Result<bool, AccountError>;
    async fn login(&self, email: &str, password: &str) -> Result<String, AccountError>;
    async fn create_user(&self, req: CreateUserRequest) -> Result<Uuid, AccountError>;
    async fn get_users(&self, filter: UserFilter) -> Result<Vec<User>, AccountError>;
    async fn get_user(&self, filter: UserFilter) -> Result<User, AccountError>;
    async fn update_user(&self, filter: UserFilter, patch: UserPatch) -> Result<UpdateOutcome, AccountError>;
    async fn delete_user(&self, filter: UserFilter) -> Result<DeleteOutcome, AccountError>;
}

pub struct Accounts {
    repo: Arc<dyn UserRepository>,
    credentials: Credentials,
    keys: JwtKeys,
}

impl Accounts {
    pub fn new(repo: Arc<dyn UserRepository>, credentials: Credentials, keys: JwtKeys) -> Self {
        Self {
            repo,
            credentials,
            keys,
        }
    }
}

#[async_trait]
impl AccountService for Accounts {
    async fn ensure_admin_exists(&self) -> Result<bool, AccountError> {
        if self.repo.count_all().await? > 0 {
            return Ok(false);
        }

        let admin = CreateUserRequest {
            first_name: "Admin".into(),
            last_name: "User".into(),
            email: ADMIN_EMAIL.into(),
            role: "ADMIN".into(),
            password: ADMIN_PASSWORD.into(),
            ..Default::default()
        };
        self.create_user(admin).await?;

        warn!("Default admin user created: {ADMIN_EMAIL} / {ADMIN_PASSWORD}");
        Ok(true)
    }

    #[instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &str) -> Result<String, AccountError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AccountError::Validation("Email and password are required"));
        }

        let user = self.repo.find_one(&UserFilter::Email(email.to_string())).await?;

        if user.is_blocked {
            warn!(user_id = %user.id, "login for blocked user");
            return Err(AccountError::Blocked);
        }

        if !self.credentials.spawn_verify(&user.password_hash, password).await? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AccountError::InvalidPassword);
        }

        let claims = Claims::for_user(&user, OffsetDateTime::now_utc(), self.keys.ttl)
            .ok_or_else(|| anyhow::anyhow!("token expiry out of range for ttl {}", self.keys.ttl))?;
        let token = self.keys.issue(&claims).context("issue access token")?;

        info!(user_id = %user.id, "user logged in");
        Ok(token)
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    async fn create_user(&self, req: CreateUserRequest) -> Result<Uuid, AccountError> {
        if req.email.trim().is_empty() || req.password.is_empty() {
            return Err(AccountError::Validation("Email and password are required"));
        }
        if !is_valid_email(&req.email) {
            return Err(AccountError::Validation("Invalid email"));
        }

        let password_hash = self.credentials.spawn_hash(&req.password).await?;
        let id = self
            .repo
            .insert(NewUser {
                first_name: req.first_name,
                last_name: req.last_name,
                email: req.email,
                phone: req.phone,
                role: req.role,
                password_hash,
            })
            .await?;

        info!(user_id = %id, "user created");
        Ok(id)
    }

    async fn get_users(&self, filter: UserFilter) -> Result<Vec<User>, AccountError> {
        Ok(self.repo.find_many(&filter).await?)
    }

    async fn get_user(&self, filter: UserFilter) -> Result<User, AccountError> {
        Ok(self.repo.find_one(&filter).await?)
    }

    #[instrument(skip(self, patch))]
    async fn update_user(&self, filter: UserFilter, patch: UserPatch) -> Result<UpdateOutcome, AccountError> {
        if let Some(email) = &patch.email {
            if !is_valid_email(email) {
                return Err(AccountError::Validation("Invalid email"));
            }
        }
        let outcome = self.repo.update(&filter, &patch).await?;
        info!(matched = outcome.matched_count, modified = outcome.modified_count, "user updated");
        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, filter: UserFilter) -> Result<DeleteOutcome, AccountError> {
        let outcome = self.repo.delete(&filter).await?;
        info!(deleted = outcome.deleted_count, "user deleted");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::password::fast_credentials, config::JwtConfig,
        users::memory::InMemoryUserRepository,
    };

    fn keys() -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: "test-secret".into(),
            ttl_minutes: 60,
        })
    }

    fn accounts_with(repo: Arc<InMemoryUserRepository>) -> Accounts {
        Accounts::new(repo, fast_credentials(), keys())
    }

    fn signup(email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            phone: "555-0100".into(),
            role: "user".into(),
            password: password.into(),
        }
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("no at sign"));
    }

    #[tokio::test]
    async fn signup_then_login_issues_token_for_that_user() {
        let accounts = accounts_with(Arc::new(InMemoryUserRepository::new()));
        let id = accounts.create_user(signup("ada@example.com", "pw-123")).await.unwrap();

        let token = accounts.login("ada@example.com", "pw-123").await.unwrap();
        assert!(!token.is_empty());
        let claims = keys().verify(&token).unwrap();
        assert_eq!(claims.id, id);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.role, "user");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[tokio::test]
    async fn login_with_unrepresentable_expiry_is_internal_error() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let far_future = JwtKeys::new(&JwtConfig {
            secret: "test-secret".into(),
            ttl_minutes: 10_000_000_000,
        });
        let accounts = Accounts::new(repo, fast_credentials(), far_future);
        accounts.create_user(signup("ada@example.com", "pw")).await.unwrap();

        let err = accounts.login("ada@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, AccountError::Internal(_)));
    }

    #[tokio::test]
    async fn create_requires_email_and_password_before_touching_store() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let accounts = accounts_with(repo.clone());

        for (email, password) in [("", "pw"), ("a@b.co", ""), ("   ", "pw")] {
            let err = accounts.create_user(signup(email, password)).await.unwrap_err();
            assert!(matches!(err, AccountError::Validation(_)));
        }
        assert_eq!(repo.count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn login_failures_are_distinct() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let accounts = accounts_with(repo.clone());
        let id = accounts.create_user(signup("ada@example.com", "right")).await.unwrap();

        let err = accounts.login("nobody@example.com", "right").await.unwrap_err();
        assert!(matches!(err, AccountError::NotFound));

        let err = accounts.login("ada@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AccountError::InvalidPassword));

        let blocked = UserPatch {
            is_blocked: Some(true),
            ..Default::default()
        };
        accounts.update_user(UserFilter::Id(id), blocked).await.unwrap();
        let err = accounts.login("ada@example.com", "right").await.unwrap_err();
        assert!(matches!(err, AccountError::Blocked));
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let accounts = accounts_with(Arc::new(InMemoryUserRepository::new()));
        accounts.create_user(signup("ada@example.com", "pw")).await.unwrap();
        let err = accounts.create_user(signup("ada@example.com", "pw")).await.unwrap_err();
        assert!(matches!(err, AccountError::Conflict));
    }

    #[tokio::test]
    async fn concurrent_signups_with_same_email_admit_one() {
        let accounts = Arc::new(accounts_with(Arc::new(InMemoryUserRepository::new())));
        let a = tokio::spawn({
            let accounts = accounts.clone();
            async move { accounts.create_user(signup("race@example.com", "pw")).await }
        });
        let b = tokio::spawn({
            let accounts = accounts.clone();
            async move { accounts.create_user(signup("race@example.com", "pw")).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AccountError::Conflict))));
    }

    #[tokio::test]
    async fn ensure_admin_exists_is_idempotent() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let accounts = accounts_with(repo.clone());

        assert!(accounts.ensure_admin_exists().await.unwrap());
        assert!(!accounts.ensure_admin_exists().await.unwrap());
        assert_eq!(repo.count_all().await.unwrap(), 1);

        let admin = accounts
            .get_user(UserFilter::Email(ADMIN_EMAIL.into()))
            .await
            .unwrap();
        assert_eq!(admin.role, "ADMIN");
        assert!(accounts.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.is_ok());
    }

    #[tokio::test]
    async fn ensure_admin_skips_populated_store() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let accounts = accounts_with(repo.clone());
        accounts.create_user(signup("ada@example.com", "pw")).await.unwrap();

        assert!(!accounts.ensure_admin_exists().await.unwrap());
        let err = accounts
            .get_user(UserFilter::Email(ADMIN_EMAIL.into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::NotFound));
    }

    #[tokio::test]
    async fn partial_update_leaves_other_fields() {
        let accounts = accounts_with(Arc::new(InMemoryUserRepository::new()));
        let id = accounts.create_user(signup("ada@example.com", "pw")).await.unwrap();

        let patch = UserPatch {
            first_name: Some("Augusta".into()),
            ..Default::default()
        };
        let outcome = accounts.update_user(UserFilter::Id(id), patch).await.unwrap();
        assert_eq!(outcome.matched_count, 1);

        let user = accounts.get_user(UserFilter::Id(id)).await.unwrap();
        assert_eq!(user.first_name, "Augusta");
        assert_eq!(user.last_name, "Lovelace");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, "user");
    }

    #[tokio::test]
    async fn update_rejects_malformed_or_taken_email() {
        let accounts = accounts_with(Arc::new(InMemoryUserRepository::new()));
        let id = accounts.create_user(signup("ada@example.com", "pw")).await.unwrap();
        accounts.create_user(signup("grace@example.com", "pw")).await.unwrap();

        let bad = UserPatch {
            email: Some(String::new()),
            ..Default::default()
        };
        let err = accounts.update_user(UserFilter::Id(id), bad).await.unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));

        let taken = UserPatch {
            email: Some("grace@example.com".into()),
            ..Default::default()
        };
        let err = accounts.update_user(UserFilter::Id(id), taken).await.unwrap_err();
        assert!(matches!(err, AccountError::Conflict));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let accounts = accounts_with(Arc::new(InMemoryUserRepository::new()));
        let id = accounts.create_user(signup("ada@example.com", "pw")).await.unwrap();

        let outcome = accounts.delete_user(UserFilter::Id(id)).await.unwrap();
        assert_eq!(outcome.deleted_count, 1);
        let outcome = accounts.delete_user(UserFilter::Id(id)).await.unwrap();
        assert_eq!(outcome.deleted_count, 0);

        assert!(matches!(
            accounts.get_user(UserFilter::Id(id)).await,
            Err(AccountError::NotFound)
        ));
    }
}
