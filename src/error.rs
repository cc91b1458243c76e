use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::ErrorResponse;
use crate::messages;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("NotFound: {0}")]
    NotFound(&'static str),
    #[error("Forbidden")]
    Forbidden,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Database: {0}")]
    Database(#[from] anyhow::Error),
    #[error("Template: {0}")]
    Template(#[from] askama::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        use AppError::*;
        match self {
            NotFound(_) => StatusCode::NOT_FOUND,
            Forbidden => StatusCode::FORBIDDEN,
            Unauthorized => StatusCode::UNAUTHORIZED,
            Database(_) | Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        use AppError::*;
        match self {
            NotFound(msg) => *msg,
            Forbidden => messages::FORBIDDEN,
            Unauthorized => messages::LOGIN_REQUIRED,
            Database(_) | Template(_) => "internal error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(e) => tracing::error!(error = %format!("{e:#}"), "database error"),
            AppError::Template(e) => tracing::error!(error = %e, "template error"),
            _ => {}
        }

        let body = ErrorResponse {
            error: self.public_message().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
