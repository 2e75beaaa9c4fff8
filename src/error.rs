use thiserror::Error;

use crate::auth::AuthError;
use crate::types::MissionStatus;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("{0}")]
    Validation(String),
    #[error("deleting a mission requires explicit confirmation")]
    ConfirmationRequired,
    #[error("mission cannot move from {} via {action}", .status.as_str())]
    InvalidTransition {
        status: MissionStatus,
        action: String,
    },
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        ServiceError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
