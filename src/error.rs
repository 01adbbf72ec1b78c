use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::error;

use crate::models::response::ErrorBody;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid JSON")]
    InvalidJson,

    #[error("{0}")]
    InvalidPayload(String),

    #[error("Missing push gateway configuration: {0}")]
    MissingConfiguration(String),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::InvalidJson | AppError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            AppError::MissingConfiguration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
