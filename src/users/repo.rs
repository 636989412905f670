use std::{future::Future, time::Duration};

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::users::repo_types::{DeleteOutcome, NewUser, UpdateOutcome, User, UserFilter, UserPatch};

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, phone, role, password_hash, is_blocked, created_at";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("duplicate key")]
    DuplicateKey,
    #[error("record not found")]
    NotFound,
    #[error("store call exceeded its deadline")]
    Timeout,
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            RepoError::DuplicateKey
        } else {
            RepoError::Database(err)
        }
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Persistent user collection. Each call is a single atomic store operation.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: NewUser) -> Result<Uuid, RepoError>;
    async fn find_many(&self, filter: &UserFilter) -> Result<Vec<User>, RepoError>;
    async fn find_one(&self, filter: &UserFilter) -> Result<User, RepoError>;
    async fn update(&self, filter: &UserFilter, patch: &UserPatch) -> Result<UpdateOutcome, RepoError>;
    async fn delete(&self, filter: &UserFilter) -> Result<DeleteOutcome, RepoError>;
    async fn count_all(&self) -> Result<i64, RepoError>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
    timeout: Duration,
}

impl PgUserRepository {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    async fn with_deadline<T, F>(&self, op: &'static str, fut: F) -> Result<T, RepoError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(RepoError::from),
            Err(_) => {
                warn!(op, timeout_ms = self.timeout.as_millis() as u64, "store call timed out");
                Err(RepoError::Timeout)
            }
        }
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    match filter {
        UserFilter::All => {}
        UserFilter::Id(id) => {
            qb.push(" WHERE id = ").push_bind(*id);
        }
        UserFilter::Email(email) => {
            qb.push(" WHERE email = ").push_bind(email.clone());
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: NewUser) -> Result<Uuid, RepoError> {
        let query = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (first_name, last_name, email, phone, role, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.role)
        .bind(&user.password_hash);
        let id = self.with_deadline("insert", query.fetch_one(&self.db)).await?;
        debug!(user_id = %id, "user inserted");
        Ok(id)
    }

    async fn find_many(&self, filter: &UserFilter) -> Result<Vec<User>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at ASC");
        self.with_deadline("find_many", qb.build_query_as::<User>().fetch_all(&self.db))
            .await
    }

    async fn find_one(&self, filter: &UserFilter) -> Result<User, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_filter(&mut qb, filter);
        qb.push(" LIMIT 1");
        self.with_deadline("find_one", qb.build_query_as::<User>().fetch_optional(&self.db))
            .await?
            .ok_or(RepoError::NotFound)
    }

    async fn update(&self, filter: &UserFilter, patch: &UserPatch) -> Result<UpdateOutcome, RepoError> {
        if patch.is_empty() {
            let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
            push_filter(&mut qb, filter);
            let matched = self
                .with_deadline("update", qb.build_query_scalar::<i64>().fetch_one(&self.db))
                .await?;
            return Ok(UpdateOutcome {
                matched_count: matched as u64,
                modified_count: 0,
            });
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        let mut set = qb.separated(", ");
        if let Some(v) = &patch.first_name {
            set.push("first_name = ").push_bind_unseparated(v.clone());
        }
        if let Some(v) = &patch.last_name {
            set.push("last_name = ").push_bind_unseparated(v.clone());
        }
        if let Some(v) = &patch.email {
            set.push("email = ").push_bind_unseparated(v.clone());
        }
        if let Some(v) = &patch.phone {
            set.push("phone = ").push_bind_unseparated(v.clone());
        }
        if let Some(v) = &patch.role {
            set.push("role = ").push_bind_unseparated(v.clone());
        }
        if let Some(v) = patch.is_blocked {
            set.push("is_blocked = ").push_bind_unseparated(v);
        }
        push_filter(&mut qb, filter);

        let res = self.with_deadline("update", qb.build().execute(&self.db)).await?;
        Ok(UpdateOutcome {
            matched_count: res.rows_affected(),
            modified_count: res.rows_affected(),
        })
    }

    async fn delete(&self, filter: &UserFilter) -> Result<DeleteOutcome, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM users");
        push_filter(&mut qb, filter);
        let res = self.with_deadline("delete", qb.build().execute(&self.db)).await?;
        Ok(DeleteOutcome {
            deleted_count: res.rows_affected(),
        })
    }

    async fn count_all(&self) -> Result<i64, RepoError> {
        let query = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users");
        self.with_deadline("count_all", query.fetch_one(&self.db)).await
    }
}
