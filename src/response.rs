use std::borrow::Cow;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::accounts::errors::AccountError;

/// Uniform body of every API response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

impl Envelope<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

pub type ApiResult<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

pub fn success<T: Serialize>(status: StatusCode, data: T) -> ApiResult<T> {
    Ok((status, Json(Envelope::ok(data))))
}

/// Error leaving the HTTP boundary. The cause is logged, only `message` reaches the client.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: Cow<'static, str>,
    cause: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl std::fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        let (status, message) = match &err {
            AccountError::Validation(msg) => (StatusCode::BAD_REQUEST, *msg),
            AccountError::NotFound => (StatusCode::NOT_FOUND, "User Not Found"),
            AccountError::InvalidPassword => (StatusCode::UNAUTHORIZED, "Invalid Password"),
            AccountError::Blocked => (StatusCode::FORBIDDEN, "User Is Blocked"),
            AccountError::Conflict => (StatusCode::CONFLICT, "Email Already Exists"),
            AccountError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };
        ApiError::new(status, message).with_cause(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request("Bad Request").with_cause(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let cause = self.cause.as_deref().unwrap_or("-");
        if self.status.is_server_error() {
            error!(status = %self.status, cause, "{}", self.message);
        } else {
            warn!(status = %self.status, cause, "{}", self.message);
        }
        (self.status, Json(Envelope::error(self.message))).into_response()
    }
}
