//! Admin API authentication
//!
//! Admin requests carry `Authorization: Bearer <secret>`. With no secret
//! configured the admin API is disabled outright, which callers see as a
//! different error from a wrong secret.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use tracing::warn;

use crate::error::ApiError;

/// Check the bearer secret on an admin request
pub fn require_admin(secret: Option<&str>, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = secret else {
        return Err(ApiError::AdminDisabled);
    };

    let given = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match given {
        Some(given) if safe_equal(given, expected) => Ok(()),
        _ => {
            warn!("Rejected admin request with missing or wrong secret");
            Err(ApiError::Unauthorized)
        }
    }
}

/// Constant-time string comparison
fn safe_equal(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}
