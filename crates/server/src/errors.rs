use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use onboard::StoreError;
use onboard_access::AccessError;
use serde_json::{json, Value};
use tracing::error;

/// A custom error type for the server application.
///
/// This enum encapsulates different kinds of errors that can occur within
/// the server, allowing them to be converted into appropriate HTTP responses
/// carrying the standard `{message, data}` envelope.
pub enum AppError {
    /// Errors originating from the form and submission stores.
    Store(StoreError),
    /// Errors originating from the access crate.
    Access(AccessError),
    /// The request needs a valid login and has none.
    Unauthenticated(String),
    /// The caller is logged in but not allowed to do this.
    Forbidden(String),
    /// The request body is malformed.
    BadRequest(String),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        AppError::Access(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, message, data): (StatusCode, String, Value) = match self {
            AppError::Store(err) => match err {
                StoreError::Validation(errors) => (
                    StatusCode::BAD_REQUEST,
                    "Validation failed.".to_string(),
                    json!(errors),
                ),
                StoreError::DuplicateName(_) => (
                    StatusCode::BAD_REQUEST,
                    "Validation failed.".to_string(),
                    json!({ "name": [err.to_string()] }),
                ),
                StoreError::DuplicateFieldName(_) => (
                    StatusCode::BAD_REQUEST,
                    "Validation failed.".to_string(),
                    json!({ "name": [err.to_string()] }),
                ),
                StoreError::NotFound(what) => (
                    StatusCode::NOT_FOUND,
                    format!("{what} not found."),
                    Value::Null,
                ),
                other => {
                    error!("Store error: {other:?}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "An internal server error occurred.".to_string(),
                        Value::Null,
                    )
                }
            },
            AppError::Access(err) => match err {
                AccessError::DuplicateUsername(_) => (
                    StatusCode::BAD_REQUEST,
                    "Validation failed.".to_string(),
                    json!({ "username": [err.to_string()] }),
                ),
                AccessError::DuplicateEmail(_) => (
                    StatusCode::BAD_REQUEST,
                    "Validation failed.".to_string(),
                    json!({ "email": [err.to_string()] }),
                ),
                AccessError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    err.to_string(),
                    Value::Null,
                ),
                AccessError::NotFound(what) => (
                    StatusCode::NOT_FOUND,
                    format!("{what} not found."),
                    Value::Null,
                ),
                other => {
                    error!("Access error: {other:?}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "An internal server error occurred.".to_string(),
                        Value::Null,
                    )
                }
            },
            AppError::Unauthenticated(message) => {
                (StatusCode::UNAUTHORIZED, message, Value::Null)
            }
            AppError::Forbidden(message) => (StatusCode::FORBIDDEN, message, Value::Null),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, Value::Null),
            AppError::Internal(err) => {
                error!("Internal server error: {err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                    Value::Null,
                )
            }
        };

        let body = Json(json!({
            "message": message,
            "data": data,
        }));

        (status_code, body).into_response()
    }
}
