use std::any::Any;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::pages;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Username already exists. Try a different one.")]
    DuplicateUsername,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Event {0} not found")]
    EventNotFound(i64),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        match err.try_into_panic() {
            Ok(payload) => AppError::Internal(anyhow::anyhow!(panic_message(payload.as_ref()))),
            Err(err) => AppError::Internal(anyhow::Error::new(err)),
        }
    }
}

impl AppError {
    /// Attach the `?user=` identity so error pages keep their navigation.
    pub fn for_user(self, user: &str) -> UserFault {
        UserFault {
            user: user.to_string(),
            error: self,
        }
    }

    fn render(self, user: Option<&str>) -> Response {
        match self {
            AppError::DuplicateUsername => (StatusCode::OK, self.to_string()).into_response(),
            AppError::InvalidCredentials => {
                (StatusCode::OK, Html(pages::login(Some(&self.to_string())))).into_response()
            }
            AppError::EventNotFound(_) => error_page(StatusCode::NOT_FOUND, &self.to_string(), user),
            AppError::Internal(ref e) => {
                error!("Unhandled fault: {:#}", e);
                error_page(StatusCode::INTERNAL_SERVER_ERROR, &self.to_string(), user)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.render(None)
    }
}

/// An [`AppError`] raised on a page that carries an identity.
#[derive(Debug)]
pub struct UserFault {
    pub user: String,
    pub error: AppError,
}

impl IntoResponse for UserFault {
    fn into_response(self) -> Response {
        self.error.render(Some(&self.user))
    }
}

/// The 500 page. The fault text is shown to the client as-is (escaped).
pub fn internal_error(detail: &str) -> Response {
    error_page(StatusCode::INTERNAL_SERVER_ERROR, detail, None)
}

fn error_page(status: StatusCode, detail: &str, user: Option<&str>) -> Response {
    (status, Html(pages::error(status.as_u16(), detail, user))).into_response()
}

/// Text of a panic payload, for `panic!("literal")` and `panic!("{}", x)`.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    }
}
