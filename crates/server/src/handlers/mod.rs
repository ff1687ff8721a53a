//! # API Route Handlers
//!
//! This module organizes all the Axum route handlers for the
//! `onboard-server`. The handlers are split into logical sub-modules based on
//! their functionality (auth, forms, fields, submissions).

pub mod auth_handlers;
pub mod field_handlers;
pub mod form_handlers;
pub mod general;
pub mod submission_handlers;

// Re-export all handlers from the sub-modules to make them easily accessible
// to the router under a single `handlers::` path.
pub use auth_handlers::*;
pub use field_handlers::*;
pub use form_handlers::*;
pub use general::*;
pub use submission_handlers::*;

// Shared items used by multiple handler modules.
use super::{errors::AppError, state::AppState, types::ApiResponse};
use axum::Json;

/// Wraps a successful result in the standard `{message, data}` envelope.
pub(crate) fn respond<T>(message: impl Into<String>, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        message: message.into(),
        data,
    })
}
