use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::users::repo_types::User;

/// JWT payload issued at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub iat: i64, // issued at (unix timestamp)
    pub exp: i64, // expires at (unix timestamp)
}

impl Claims {
    /// Returns `None` when `now + ttl` falls outside the representable date range.
    pub fn for_user(user: &User, now: OffsetDateTime, ttl: Duration) -> Option<Self> {
        let exp = now.checked_add(ttl)?;
        Some(Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        })
    }
}

/// Authenticated caller, rebuilt from verified claims for the lifetime of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub exp: i64,
}

impl From<Claims> for UserContext {
    fn from(c: Claims) -> Self {
        Self {
            id: c.id,
            first_name: c.first_name,
            last_name: c.last_name,
            email: c.email,
            role: c.role,
            exp: c.exp,
        }
    }
}
