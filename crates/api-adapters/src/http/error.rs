use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::{DomainError, ErrorKind};
use serde::Serialize;
use services::CascadeError;

#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    Cascade(CascadeError),
    Unauthorized(&'static str),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<&'static str>,
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<CascadeError> for ApiError {
    fn from(err: CascadeError) -> Self {
        ApiError::Cascade(err)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Conflict | ErrorKind::SelfReference => StatusCode::CONFLICT,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for(err: &DomainError) -> String {
    match err {
        DomainError::Storage(detail) => {
            tracing::error!(error = %detail, "storage failure");
            "Internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (kind, body) = match self {
            ApiError::Unauthorized(message) => {
                let body = ErrorBody {
                    message: message.to_string(),
                    step: None,
                };
                return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
            }
            ApiError::Domain(err) => (
                err.kind(),
                ErrorBody {
                    message: message_for(&err),
                    step: None,
                },
            ),
            ApiError::Cascade(err) => (
                err.kind(),
                ErrorBody {
                    message: message_for(&err.source),
                    step: Some(err.step.as_str()),
                },
            ),
        };

        let mut response = (status_for(kind), Json(body)).into_response();
        // Read back by the error-counting middleware.
        response.extensions_mut().insert(kind);
        response
    }
}
