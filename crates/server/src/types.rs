use serde::{Deserialize, Serialize};

/// The envelope every endpoint responds with: a human-readable message and
/// the payload.
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}
