use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::AppState;
use super::errors::AppError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests without the configured API key. A no-op when no key is
/// configured.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(key) if keys_match(key.as_bytes(), expected.as_bytes()) => next.run(request).await,
        Some(_) => AppError::Unauthorized("Invalid API key".to_string()).into_response(),
        None => AppError::Unauthorized(format!("Missing {} header", API_KEY_HEADER)).into_response(),
    }
}

/// Byte comparison whose running time does not depend on where the keys
/// first differ. Only the length can leak.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    provided.len() == expected.len()
        && provided
            .iter()
            .zip(expected)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::keys_match;

    #[test]
    fn keys_match_only_on_identical_bytes() {
        assert!(keys_match(b"s3cret", b"s3cret"));
        assert!(!keys_match(b"s3creT", b"s3cret"));
        assert!(!keys_match(b"x3cret", b"s3cret"));
        assert!(!keys_match(b"s3cre", b"s3cret"));
        assert!(!keys_match(b"", b"s3cret"));
    }
}
