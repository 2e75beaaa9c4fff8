use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::auth::AuthError;
use crate::error::ServiceError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Service(e) => match e {
                ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
                ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::ConfirmationRequired => StatusCode::PRECONDITION_REQUIRED,
                ServiceError::InvalidTransition { .. } => StatusCode::CONFLICT,
                ServiceError::Auth(auth) => match auth {
                    AuthError::InvalidCredentials | AuthError::InvalidSession => {
                        StatusCode::UNAUTHORIZED
                    }
                    AuthError::AlreadyRegistered => StatusCode::CONFLICT,
                    AuthError::Rejected(_) => StatusCode::BAD_REQUEST,
                    AuthError::Backend(_) => StatusCode::BAD_GATEWAY,
                },
                ServiceError::Backend(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("request failed: {}", self);
        }

        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
