//! # Authentication Middleware
//!
//! This module provides the Axum extractor for JWT-based authentication.
//! Form and field reads are open to anonymous clients, so the extractor
//! resolves to an *optional* user: no `Authorization` header means an
//! anonymous caller, while a present-but-invalid token is rejected with
//! `401`.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use onboard_access::{get_user, AccessError, User};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::{errors::AppError, state::AppState};

/// Represents the claims we expect to find in the JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The subject of the token: the user's database ID.
    pub sub: String,
    /// The expiration timestamp.
    pub exp: usize,
}

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "a-secure-secret-key".to_string())
}

/// Issues a signed token for a user ID, valid for `ttl_secs` seconds.
pub fn issue_token(user_id: &str, ttl_secs: u64) -> Result<String, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System time is before UNIX EPOCH.")))?
        .as_secs();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + ttl_secs) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_ref()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {e}")))
}

/// An Axum extractor that resolves the caller's identity.
///
/// - **No token present**: resolves to an anonymous caller (`None`).
/// - **Valid token present**: resolves to the authenticated user.
/// - **Invalid/expired token present**: rejects the request with `401`.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Option<User>);

impl CurrentActor {
    /// The authenticated user, or `401` for anonymous callers.
    pub fn require_user(self) -> Result<User, AppError> {
        self.0
            .ok_or_else(|| AppError::Unauthenticated("Authentication required.".to_string()))
    }

    /// The authenticated user if they clear admin checks, `401`/`403`
    /// otherwise.
    pub fn require_admin(self) -> Result<User, AppError> {
        let user = self.require_user()?;
        if !user.is_admin() {
            return Err(AppError::Forbidden(
                "You do not have permission to perform this action.".to_string(),
            ));
        }
        Ok(user)
    }
}

/// A custom rejection type for authentication failures, keeping the standard
/// response envelope.
pub struct AuthRejection(StatusCode, String);

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            self.0,
            Json(json!({ "message": self.1, "data": Value::Null })),
        )
            .into_response()
    }
}

impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer_header =
            Option::<TypedHeader<Authorization<Bearer>>>::from_request_parts(parts, state)
                .await
                .map_err(|e| {
                    warn!("Unexpected error during header extraction: {}", e);
                    AuthRejection(
                        StatusCode::BAD_REQUEST,
                        "Invalid Authorization header format.".to_string(),
                    )
                })?;

        let Some(TypedHeader(Authorization(bearer))) = bearer_header else {
            return Ok(CurrentActor(None));
        };

        let token_data = decode::<Claims>(
            bearer.token(),
            &DecodingKey::from_secret(jwt_secret().as_ref()),
            &Validation::default(),
        )
        .map_err(|e| {
            warn!("JWT validation failed: {}", e);
            AuthRejection(
                StatusCode::UNAUTHORIZED,
                "Invalid or expired token.".to_string(),
            )
        })?;

        // A token for a since-deleted account is as good as no token.
        let user = get_user(&state.sqlite_provider.db, &token_data.claims.sub)
            .await
            .map_err(|e| match e {
                AccessError::NotFound(_) => AuthRejection(
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token.".to_string(),
                ),
                other => {
                    warn!("Failed to resolve token subject: {}", other);
                    AuthRejection(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Could not retrieve user.".to_string(),
                    )
                }
            })?;

        Ok(CurrentActor(Some(user)))
    }
}
