use anyhow::anyhow;
use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::warn;

/// Per-request failure taxonomy. Nothing here is retried; every failure is
/// terminal for the request that produced it.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

/// The error envelope every endpoint shares:
/// `{"success": false, "error": "...", "message": "..."?}`.
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AppError::Internal(source) => {
                warn!("Internal error: {source:#}");
                Some(source.to_string())
            }
            _ => None,
        };

        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Drop-in replacement for [`axum::Json`]. An unreadable body is rendered
/// through the shared envelope instead of axum's plain-text rejection.
#[derive(Debug)]
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(request, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::Internal(anyhow!("{}", rejection.body_text()))),
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}
