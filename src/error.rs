use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::response::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal failure whose text is intentionally returned to the caller.
    #[error("{0}")]
    Diagnostic(String),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Migration error")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Validation(_) => "validation_error",
            AppError::Conflict(_) => "conflict",
            AppError::Diagnostic(_)
            | AppError::OrmError(_)
            | AppError::MigrateError(_)
            | AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Diagnostic(_)
            | AppError::OrmError(_)
            | AppError::MigrateError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
    kind: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::OrmError(err) => {
                tracing::error!(error = %err, "database failure");
                "Internal Server Error".to_string()
            }
            AppError::MigrateError(err) => {
                tracing::error!(error = %err, "migration failure");
                "Internal Server Error".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal failure");
                "Internal Server Error".to_string()
            }
            AppError::Diagnostic(msg) => {
                tracing::error!(error = %msg, "internal failure surfaced to caller");
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = ApiResponse::failure(
            message.clone(),
            ErrorData {
                error: message,
                kind: self.kind(),
            },
        );

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_of(err: AppError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn internal_errors_hide_their_cause() {
        let body = body_of(AppError::Internal(anyhow::anyhow!("db password leaked"))).await;
        assert_eq!(body["message"], "Internal Server Error");
        assert_eq!(body["data"]["kind"], "internal_error");
    }

    #[tokio::test]
    async fn diagnostic_errors_keep_their_cause() {
        let err = AppError::Diagnostic("aggregation failed".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(err).await;
        assert_eq!(body["message"], "aggregation failed");
    }

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(AppError::NotFound("bill").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::NotFound("bill").to_string(), "bill not found");
    }
}
